use thiserror::Error;

/// Main error type for the prediction service
#[derive(Error, Debug)]
pub enum ConsumoError {
    // Model lifecycle errors
    #[error("Model load failed: {0}")]
    ModelLoad(#[from] LoadError),

    #[error("Modelo no cargado")]
    ModelUnavailable,

    #[error("Inference failed: {0}")]
    Inference(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for ConsumoError
pub type Result<T> = std::result::Result<T, ConsumoError>;

/// Failures while acquiring the model at startup.
///
/// Every variant degrades the service instead of aborting the process.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Invalid model URI: {0}")]
    InvalidUri(String),

    #[error("Registry host is not configured (set registry.host or DATABRICKS_HOST)")]
    MissingRegistryHost,

    #[error("Registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registry returned {status}: {body}")]
    Registry { status: u16, body: String },

    #[error("Unsupported artifact location: {0}")]
    UnsupportedArtifactUri(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Artifact read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact decode failed: {0}")]
    Decode(String),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for LoadError {
    fn from(err: base64::DecodeError) -> Self {
        LoadError::Decode(format!("base64: {err}"))
    }
}
