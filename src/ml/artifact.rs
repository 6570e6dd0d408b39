//! The `model.json` artifact: signature, vocabulary and one model body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::frame::{Row, Signature};
use super::linear::LinearModel;
use super::tree::DecisionTree;
use super::Regressor;
use crate::error::{ConsumoError, LoadError, Result};

/// File name looked up below an artifact root.
pub const ARTIFACT_FILE: &str = "model.json";

/// The only target transform the prediction path inverts.
pub const LOG1P: &str = "log1p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    DecisionTree,
    Linear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub flavor: Flavor,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    pub signature: Signature,
    #[serde(default)]
    pub target_transform: Option<String>,
    /// Training-time vocabulary per string column.
    #[serde(default)]
    pub categories: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub tree: Option<DecisionTree>,
    #[serde(default)]
    pub linear: Option<LinearModel>,
    /// Free-form training metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ModelArtifact {
    pub fn from_slice(bytes: &[u8]) -> std::result::Result<Self, LoadError> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        artifact.validate().map_err(LoadError::InvalidArtifact)?;
        Ok(artifact)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.signature.validate()?;

        for column in self.categories.keys() {
            let idx = self
                .signature
                .index_of(column)
                .ok_or_else(|| format!("vocabulary for unknown column '{column}'"))?;
            if self.signature.inputs[idx].ty.is_numeric() {
                return Err(format!("vocabulary on numeric column '{column}'"));
            }
        }

        match self.flavor {
            Flavor::DecisionTree => self
                .tree
                .as_ref()
                .ok_or_else(|| "decision_tree flavor requires a 'tree' section".to_string())?
                .validate(&self.signature),
            Flavor::Linear => self
                .linear
                .as_ref()
                .ok_or_else(|| "linear flavor requires a 'linear' section".to_string())?
                .validate(&self.signature),
        }
    }

    /// Consume the artifact into a ready-to-query model.
    pub fn into_model(self, source_uri: &str) -> std::result::Result<ArtifactModel, LoadError> {
        self.validate().map_err(LoadError::InvalidArtifact)?;

        match self.target_transform.as_deref() {
            None | Some(LOG1P) => {}
            Some(other) => warn!(
                transform = other,
                "artifact declares a target transform other than log1p; predictions are still inverted with expm1"
            ),
        }

        let body = match self.flavor {
            Flavor::DecisionTree => ModelBody::Tree(self.tree.ok_or_else(|| {
                LoadError::InvalidArtifact("missing tree section".to_string())
            })?),
            Flavor::Linear => ModelBody::Linear(self.linear.ok_or_else(|| {
                LoadError::InvalidArtifact("missing linear section".to_string())
            })?),
        };

        if let ModelBody::Tree(tree) = &body {
            debug!(
                nodes = tree.nodes.len(),
                leaves = tree.leaf_count(),
                "decision tree ready"
            );
        }

        let info = ModelInfo {
            name: self.name,
            version: self.version,
            flavor: self.flavor,
            source_uri: source_uri.to_string(),
            loaded_at: Utc::now(),
        };

        Ok(ArtifactModel {
            signature: self.signature,
            vocabulary: self
                .categories
                .into_iter()
                .map(|(column, values)| (column, values.into_iter().collect()))
                .collect(),
            body,
            info,
        })
    }
}

/// What was loaded and from where.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub flavor: Flavor,
    pub source_uri: String,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
enum ModelBody {
    Tree(DecisionTree),
    Linear(LinearModel),
}

/// A validated artifact, ready for inference.
#[derive(Debug, Clone)]
pub struct ArtifactModel {
    signature: Signature,
    vocabulary: HashMap<String, HashSet<String>>,
    body: ModelBody,
    info: ModelInfo,
}

impl ArtifactModel {
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn predict_row(&self, row: &Row) -> Result<f64> {
        let features = self.signature.enforce(row)?;

        for (spec, value) in self.signature.inputs.iter().zip(&features) {
            let (Some(known), Some(category)) =
                (self.vocabulary.get(&spec.name), value.as_str())
            else {
                continue;
            };
            if !known.contains(category) {
                return Err(ConsumoError::Inference(format!(
                    "unseen category '{category}' for column '{}'",
                    spec.name
                )));
            }
        }

        match &self.body {
            ModelBody::Tree(tree) => tree.evaluate(&features),
            ModelBody::Linear(linear) => linear.evaluate(&self.signature, &features),
        }
    }
}

impl Regressor for ArtifactModel {
    fn predict(&self, rows: &[Row]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }
}
