//! Model acquisition: URI parsing, registry lookups and artifact loading.

pub mod client;
pub mod uri;

use async_trait::async_trait;
use std::time::Instant;
use tracing::info;

use crate::config::AppConfig;
use crate::error::LoadError;
use crate::ml::{LoadedModel, ModelArtifact};

pub use client::RegistryClient;
pub use uri::{ArtifactLocation, ModelUri};

/// Anything that can produce the raw artifact bytes for a model URI.
#[async_trait]
pub trait ModelSource: Send + Sync {
    async fn fetch(&self, uri: &ModelUri) -> Result<Vec<u8>, LoadError>;
}

/// Fetch, decode and validate the model behind `uri`.
pub async fn load_model(source: &dyn ModelSource, uri: &str) -> Result<LoadedModel, LoadError> {
    let started = Instant::now();
    let parsed: ModelUri = uri.parse()?;

    let bytes = source.fetch(&parsed).await?;
    let model = ModelArtifact::from_slice(&bytes)?.into_model(uri)?;

    info!(
        uri,
        flavor = ?model.info().flavor,
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "model artifact loaded"
    );
    Ok(LoadedModel::from(model))
}

/// Single load attempt for the configured model; no retries.
pub async fn load_from_config(config: &AppConfig) -> Result<LoadedModel, LoadError> {
    let client = RegistryClient::new(&config.registry)?;
    load_model(&client, &config.model.uri).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{Row, Value};

    struct StaticSource(&'static str);

    #[async_trait]
    impl ModelSource for StaticSource {
        async fn fetch(&self, uri: &ModelUri) -> Result<Vec<u8>, LoadError> {
            assert!(matches!(uri, ModelUri::Registered { .. }));
            Ok(self.0.as_bytes().to_vec())
        }
    }

    const CONSTANT_TREE: &str = r#"{
        "flavor": "decision_tree",
        "signature": {"inputs": [{"name": "dia", "type": "int32"}]},
        "tree": {"nodes": [{"kind": "leaf", "value": 2.0}]}
    }"#;

    #[tokio::test]
    async fn test_load_model_from_source() {
        let loaded = load_model(&StaticSource(CONSTANT_TREE), "models:/consumo_model/2")
            .await
            .unwrap();
        assert_eq!(loaded.info.source_uri, "models:/consumo_model/2");

        let out = loaded
            .model
            .predict(&[Row::new().with("dia", Value::Int32(1))])
            .unwrap();
        assert_eq!(out, vec![2.0]);
    }

    #[tokio::test]
    async fn test_invalid_uri_never_fetches() {
        let err = load_model(&StaticSource(CONSTANT_TREE), "models:/consumo_model")
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidUri(_)));
    }

    #[tokio::test]
    async fn test_invalid_artifact_is_load_error() {
        let err = load_model(&StaticSource("{\"flavor\": \"svm\"}"), "models:/x/1")
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }
}
