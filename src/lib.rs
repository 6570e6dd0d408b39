pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod ml;
pub mod registry;
pub mod services;

pub use api::{create_router, AppState};
pub use config::AppConfig;
pub use domain::{PredictRequest, PredictResponse};
pub use error::{ConsumoError, LoadError, Result};
pub use ml::{LoadedModel, ModelInfo, Regressor};
pub use registry::{load_from_config, load_model, ModelSource, ModelUri, RegistryClient};
pub use services::{HealthStatus, ModelState, PredictionService};
