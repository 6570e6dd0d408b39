use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

use crate::error::LoadError;

const MODELS_SCHEME: &str = "models:/";

/// Where the configured model comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelUri {
    /// `models:/<name>/<version>`
    Registered { name: String, version: String },
    /// `models:/<name>@<alias>`
    Alias { name: String, alias: String },
    /// `file:///...` or a plain path
    Local(PathBuf),
}

impl FromStr for ModelUri {
    type Err = LoadError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LoadError::InvalidUri("empty model URI".to_string()));
        }

        if let Some(rest) = raw.strip_prefix(MODELS_SCHEME) {
            let rest = rest.trim_start_matches('/');
            if let Some((name, alias)) = rest.split_once('@') {
                if name.is_empty() || alias.is_empty() || alias.contains('/') {
                    return Err(LoadError::InvalidUri(raw.to_string()));
                }
                return Ok(ModelUri::Alias {
                    name: name.to_string(),
                    alias: alias.to_string(),
                });
            }
            let Some((name, version)) = rest.rsplit_once('/') else {
                return Err(LoadError::InvalidUri(format!(
                    "{raw} (expected models:/<name>/<version> or models:/<name>@<alias>)"
                )));
            };
            if name.is_empty() || name.contains('/') {
                return Err(LoadError::InvalidUri(raw.to_string()));
            }
            if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit()) {
                return Err(LoadError::InvalidUri(format!(
                    "{raw} (version must be a number)"
                )));
            }
            return Ok(ModelUri::Registered {
                name: name.to_string(),
                version: version.to_string(),
            });
        }

        if raw.starts_with("file:") {
            let url = Url::parse(raw).map_err(|e| LoadError::InvalidUri(format!("{raw}: {e}")))?;
            let path = url
                .to_file_path()
                .map_err(|_| LoadError::InvalidUri(raw.to_string()))?;
            return Ok(ModelUri::Local(path));
        }

        if raw.contains("://") {
            return Err(LoadError::InvalidUri(format!(
                "{raw} (unsupported scheme for a model URI)"
            )));
        }

        Ok(ModelUri::Local(PathBuf::from(raw)))
    }
}

impl fmt::Display for ModelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelUri::Registered { name, version } => write!(f, "{MODELS_SCHEME}{name}/{version}"),
            ModelUri::Alias { name, alias } => write!(f, "{MODELS_SCHEME}{name}@{alias}"),
            ModelUri::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Artifact root returned by the registry for a model version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    Http(Url),
    /// Path below the tracking server's proxied artifact store.
    MlflowArtifacts(String),
    /// Absolute DBFS path, e.g. `/databricks/mlflow-registry/...`.
    Dbfs(String),
    Local(PathBuf),
}

impl ArtifactLocation {
    pub fn parse(raw: &str) -> Result<Self, LoadError> {
        let raw = raw.trim();
        let Ok(url) = Url::parse(raw) else {
            // No scheme: a path on this machine
            return Ok(ArtifactLocation::Local(PathBuf::from(raw)));
        };

        match url.scheme() {
            "http" | "https" => Ok(ArtifactLocation::Http(url)),
            "mlflow-artifacts" => {
                let path = url.path().trim_matches('/').to_string();
                if path.is_empty() {
                    return Err(LoadError::UnsupportedArtifactUri(raw.to_string()));
                }
                Ok(ArtifactLocation::MlflowArtifacts(path))
            }
            "dbfs" => {
                let path = format!("/{}", url.path().trim_matches('/'));
                Ok(ArtifactLocation::Dbfs(path))
            }
            "file" => url
                .to_file_path()
                .map(ArtifactLocation::Local)
                .map_err(|_| LoadError::UnsupportedArtifactUri(raw.to_string())),
            _ => Err(LoadError::UnsupportedArtifactUri(raw.to_string())),
        }
    }
}
