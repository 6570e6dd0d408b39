//! Linear regression with one-hot encoded categorical columns.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::frame::{Signature, Value};
use crate::error::{ConsumoError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    /// Weight per numeric column.
    #[serde(default)]
    pub coefficients: HashMap<String, f64>,
    /// Per string column: category value -> weight. Categories missing from
    /// the map were never seen at training time.
    #[serde(default)]
    pub category_weights: HashMap<String, HashMap<String, f64>>,
}

impl LinearModel {
    pub fn validate(&self, signature: &Signature) -> std::result::Result<(), String> {
        if !self.intercept.is_finite() {
            return Err("intercept is not finite".to_string());
        }
        for (column, weight) in &self.coefficients {
            let spec = signature
                .index_of(column)
                .map(|i| &signature.inputs[i])
                .ok_or_else(|| format!("coefficient for unknown column '{column}'"))?;
            if !spec.ty.is_numeric() {
                return Err(format!("coefficient on string column '{column}'"));
            }
            if !weight.is_finite() {
                return Err(format!("coefficient for '{column}' is not finite"));
            }
        }
        for (column, weights) in &self.category_weights {
            let spec = signature
                .index_of(column)
                .map(|i| &signature.inputs[i])
                .ok_or_else(|| format!("category weights for unknown column '{column}'"))?;
            if spec.ty.is_numeric() {
                return Err(format!("category weights on numeric column '{column}'"));
            }
            if weights.values().any(|w| !w.is_finite()) {
                return Err(format!("category weights for '{column}' are not finite"));
            }
        }
        Ok(())
    }

    /// `features` in signature order.
    pub fn evaluate(&self, signature: &Signature, features: &[&Value]) -> Result<f64> {
        let mut y = self.intercept;
        for (spec, value) in signature.inputs.iter().zip(features) {
            match value {
                Value::Str(category) => {
                    let Some(weights) = self.category_weights.get(&spec.name) else {
                        continue;
                    };
                    let w = weights.get(category).ok_or_else(|| {
                        ConsumoError::Inference(format!(
                            "unseen category '{category}' for column '{}'",
                            spec.name
                        ))
                    })?;
                    y += w;
                }
                numeric => {
                    if let Some(coef) = self.coefficients.get(&spec.name) {
                        // as_f64 is always Some for non-string values
                        y += coef * numeric.as_f64().unwrap_or_default();
                    }
                }
            }
        }
        Ok(y)
    }
}
