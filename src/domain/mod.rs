pub mod prediction;

pub use prediction::{PredictRequest, PredictResponse};
