use clap::{Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "consumo-api")]
#[command(version)]
#[command(about = "Daily electricity consumption prediction service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding default.toml and <CONSUMO_ENV>.toml
    #[arg(long, global = true, default_value = "config", env = "CONSUMO_CONFIG_DIR")]
    pub config_dir: String,

    /// Override the configured model URI (models:/name/version, models:/name@alias, path)
    #[arg(long, global = true)]
    pub model_uri: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the model and serve the HTTP API (default)
    Serve {
        /// Listen address
        #[arg(long)]
        host: Option<String>,
        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Load the model, run one prediction and print it as JSON
    Predict {
        #[arg(long)]
        dia: i64,
        #[arg(long)]
        mes: i64,
        #[arg(long)]
        municipio: String,
        #[arg(long)]
        distribuidor: String,
    },
}

impl Cli {
    /// CLI flags win over files and environment.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(uri) = &self.model_uri {
            config.model.uri = uri.clone();
        }
        if let Some(Commands::Serve { host, port }) = &self.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }
    }
}
