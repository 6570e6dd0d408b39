//! Model artifacts and CPU inference.
//!
//! The serving path only sees [`Regressor`]; the artifact flavors behind it
//! are interchangeable.

pub mod artifact;
pub mod frame;
pub mod linear;
pub mod tree;

use std::sync::Arc;

use crate::error::Result;

pub use artifact::{ArtifactModel, Flavor, ModelArtifact, ModelInfo, ARTIFACT_FILE};
pub use frame::{ColumnSpec, ColumnType, Row, Signature, Value};
pub use linear::LinearModel;
pub use tree::{DecisionTree, TreeNode};

/// An inference-capable model. Implementations must be safe to share across
/// concurrent requests without locking.
#[cfg_attr(test, mockall::automock)]
pub trait Regressor: Send + Sync {
    /// One output per input row, on the model's training scale.
    fn predict(&self, rows: &[Row]) -> Result<Vec<f64>>;
}

/// A successfully loaded model handle plus what was loaded.
#[derive(Clone)]
pub struct LoadedModel {
    pub model: Arc<dyn Regressor>,
    pub info: ModelInfo,
}

impl LoadedModel {
    pub fn new(model: Arc<dyn Regressor>, info: ModelInfo) -> Self {
        Self { model, info }
    }
}

impl From<ArtifactModel> for LoadedModel {
    fn from(model: ArtifactModel) -> Self {
        let info = model.info().clone();
        Self {
            model: Arc::new(model),
            info,
        }
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("info", &self.info)
            .finish()
    }
}
