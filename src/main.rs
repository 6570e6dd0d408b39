use anyhow::Context;
use clap::Parser;
use consumo_api::api::{start_api_server, AppState};
use consumo_api::cli::{Cli, Commands};
use consumo_api::config::AppConfig;
use consumo_api::domain::PredictRequest;
use consumo_api::error::ConsumoError;
use consumo_api::registry;
use consumo_api::services::PredictionService;
use tracing::info;

mod main_runtime;

use main_runtime::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config_dir)
        .with_context(|| format!("failed to load configuration from {}", cli.config_dir))?;
    cli.apply_overrides(&mut config);

    match &cli.command {
        None | Some(Commands::Serve { .. }) => {
            init_logging(&config.logging);
            run_server(config).await?;
        }
        Some(Commands::Predict {
            dia,
            mes,
            municipio,
            distribuidor,
        }) => {
            init_logging_simple();
            let request = PredictRequest {
                dia: *dia,
                mes: *mes,
                cups_municipio: municipio.clone(),
                cups_distribuidor: distribuidor.clone(),
            };
            run_predict(&config, &request).await?;
        }
    }

    Ok(())
}

async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    info!(
        model_uri = %config.model.uri,
        registry = config.registry.host.as_deref().unwrap_or("-"),
        "starting prediction service"
    );

    // Exactly one load attempt; failures leave the service degraded, not dead.
    let service = PredictionService::from_load_result(registry::load_from_config(&config).await);

    start_api_server(
        AppState::new(service),
        &config.server.host,
        config.server.port,
    )
    .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn run_predict(config: &AppConfig, request: &PredictRequest) -> anyhow::Result<()> {
    let model = registry::load_from_config(config)
        .await
        .map_err(ConsumoError::from)
        .with_context(|| format!("failed to load model {}", config.model.uri))?;
    let service = PredictionService::ready(model);

    let response = service.predict(request)?;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}
