//! Regression tree inference over mixed numeric/categorical features.
//!
//! Nodes live in a flat array with the root at index 0. Every child index is
//! strictly greater than its parent's, so traversal always terminates.

use serde::{Deserialize, Serialize};

use super::frame::{Signature, Value};
use crate::error::{ConsumoError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go left when `value <= threshold`.
    Numeric {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Go left when the value is one of `categories`.
    Categorical {
        feature: usize,
        categories: Vec<String>,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn validate(&self, signature: &Signature) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree must have at least one node".to_string());
        }

        let check_children = |idx: usize, left: usize, right: usize| {
            for child in [left, right] {
                if child >= self.nodes.len() {
                    return Err(format!(
                        "node[{idx}] child {child} out of range ({} nodes)",
                        self.nodes.len()
                    ));
                }
                if child <= idx {
                    return Err(format!("node[{idx}] child {child} must come after its parent"));
                }
            }
            Ok(())
        };

        let feature_type = |idx: usize, feature: usize| {
            signature
                .inputs
                .get(feature)
                .map(|c| c.ty)
                .ok_or_else(|| format!("node[{idx}] feature {feature} not in signature"))
        };

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Numeric {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if !feature_type(idx, *feature)?.is_numeric() {
                        return Err(format!(
                            "node[{idx}] numeric split on string feature {feature}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node[{idx}] threshold is not finite"));
                    }
                    check_children(idx, *left, *right)?;
                }
                TreeNode::Categorical {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if feature_type(idx, *feature)?.is_numeric() {
                        return Err(format!(
                            "node[{idx}] categorical split on numeric feature {feature}"
                        ));
                    }
                    check_children(idx, *left, *right)?;
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("node[{idx}] leaf value is not finite"));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Walk the tree for one row, `features` in signature order.
    pub fn evaluate(&self, features: &[&Value]) -> Result<f64> {
        let mut idx = 0;
        loop {
            let node = self
                .nodes
                .get(idx)
                .ok_or_else(|| ConsumoError::Internal(format!("tree node {idx} missing")))?;

            idx = match node {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Numeric {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = feature_at(features, *feature)?.as_f64().ok_or_else(|| {
                        ConsumoError::Inference(format!("feature {feature} is not numeric"))
                    })?;
                    if x <= *threshold {
                        *left
                    } else {
                        *right
                    }
                }
                TreeNode::Categorical {
                    feature,
                    categories,
                    left,
                    right,
                } => {
                    let s = feature_at(features, *feature)?.as_str().ok_or_else(|| {
                        ConsumoError::Inference(format!("feature {feature} is not a string"))
                    })?;
                    if categories.iter().any(|c| c == s) {
                        *left
                    } else {
                        *right
                    }
                }
            };
        }
    }
}

fn feature_at<'a>(features: &[&'a Value], feature: usize) -> Result<&'a Value> {
    features
        .get(feature)
        .copied()
        .ok_or_else(|| ConsumoError::Inference(format!("feature {feature} missing from row")))
}
