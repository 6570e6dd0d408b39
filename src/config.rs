use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Registered model served when nothing else is configured.
pub const DEFAULT_MODEL_URI: &str = "models:/ÁrbolDecisión/1";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener
    pub host: String,
    /// Listener port
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// `models:/<name>/<version>`, `models:/<name>@<alias>`, `file://...` or a local path
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Tracking server base URL (e.g. `https://adb-123.azuredatabricks.net`)
    #[serde(default)]
    pub host: Option<String>,
    /// Personal access token sent as a bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// HTTP timeout for registry and artifact requests
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily rolling log files; console only when unset
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("model.uri", DEFAULT_MODEL_URI)?
            .set_default("registry.timeout_secs", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific overrides (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("CONSUMO_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // CONSUMO__MODEL__URI, CONSUMO__SERVER__PORT, ...
            .add_source(
                Environment::with_prefix("CONSUMO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Self = builder.build()?.try_deserialize()?;
        cfg.registry.fill_from_databricks_env();
        Ok(cfg)
    }

    /// Defaults only, without touching files or the environment
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            model: ModelConfig {
                uri: DEFAULT_MODEL_URI.to_string(),
            },
            registry: RegistryConfig::default(),
            logging: LoggingConfig {
                level: default_log_level(),
                json: false,
                dir: None,
            },
        }
    }
}

impl RegistryConfig {
    /// Databricks-hosted registries are usually configured through the CLI's
    /// standard variables; they only apply where nothing more specific is set.
    pub fn fill_from_databricks_env(&mut self) {
        self.fill_from(
            std::env::var("DATABRICKS_HOST").ok(),
            std::env::var("DATABRICKS_TOKEN").ok(),
        );
    }

    fn fill_from(&mut self, host: Option<String>, token: Option<String>) {
        fn non_empty(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }

        if non_empty(self.host.clone()).is_none() {
            self.host = non_empty(host);
        }
        if non_empty(self.token.clone()).is_none() {
            self.token = non_empty(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    // Loading reads process-wide variables; serialize the tests that do.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let _guard = env_lock();
        let dir = std::env::temp_dir().join(format!("consumo-cfg-{}", uuid::Uuid::new_v4()));
        let cfg = AppConfig::load_from(&dir).unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.registry.timeout_secs, 30);
        assert!(!cfg.logging.json);
    }

    #[test]
    fn test_load_from_default_toml() {
        let _guard = env_lock();
        let dir = std::env::temp_dir().join(format!("consumo-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            "[server]\nport = 9100\n\n[model]\nuri = \"file:///srv/models/arbol\"\n",
        )
        .unwrap();

        let cfg = AppConfig::load_from(&dir).unwrap();
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.model.uri, "file:///srv/models/arbol");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_layer_precedence() {
        let _guard = env_lock();
        let dir = std::env::temp_dir().join(format!("consumo-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            "[server]\nhost = \"127.0.0.1\"\nport = 9100\n\n[model]\nuri = \"models:/base/1\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("development.toml"),
            "[server]\nport = 9200\n\n[model]\nuri = \"models:/dev/2\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("production.toml"),
            "[model]\nuri = \"models:/prod@champion\"\n",
        )
        .unwrap();

        std::env::remove_var("CONSUMO_ENV");
        std::env::set_var("CONSUMO__SERVER__PORT", "9300");
        let dev = AppConfig::load_from(&dir);
        std::env::remove_var("CONSUMO__SERVER__PORT");
        let dev = dev.unwrap();
        assert_eq!(dev.server.host, "127.0.0.1");
        assert_eq!(dev.server.port, 9300);
        assert_eq!(dev.model.uri, "models:/dev/2");

        std::env::set_var("CONSUMO_ENV", "production");
        let prod = AppConfig::load_from(&dir);
        std::env::remove_var("CONSUMO_ENV");
        let prod = prod.unwrap();
        assert_eq!(prod.server.port, 9100);
        assert_eq!(prod.model.uri, "models:/prod@champion");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_databricks_fallback_does_not_override() {
        let mut registry = RegistryConfig {
            host: Some("https://explicit.example".to_string()),
            token: None,
            timeout_secs: 30,
        };
        registry.fill_from(
            Some("https://env.example".to_string()),
            Some("dapi-123".to_string()),
        );
        assert_eq!(registry.host.as_deref(), Some("https://explicit.example"));
        assert_eq!(registry.token.as_deref(), Some("dapi-123"));
    }

    #[test]
    fn test_databricks_fallback_ignores_blank_values() {
        let mut registry = RegistryConfig {
            host: Some("  ".to_string()),
            ..RegistryConfig::default()
        };
        registry.fill_from(Some("https://env.example".to_string()), Some(String::new()));
        assert_eq!(registry.host.as_deref(), Some("https://env.example"));
        assert!(registry.token.is_none());
    }
}
