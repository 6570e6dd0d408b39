pub mod prediction;

pub use prediction::{HealthStatus, ModelState, PredictionService};
