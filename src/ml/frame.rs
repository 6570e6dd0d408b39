//! Named-column input rows and the input signature a model declares.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConsumoError, Result};

/// Column type as declared in a model signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int32,
    Int64,
    Double,
    String,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ColumnType::String)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::Double => "double",
            ColumnType::String => "string",
        };
        f.write_str(s)
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    Double(f64),
    Str(String),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Int32(_) => ColumnType::Int32,
            Value::Int64(_) => ColumnType::Int64,
            Value::Double(_) => ColumnType::Double,
            Value::Str(_) => ColumnType::String,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// One input row: ordered `(column, value)` pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.columns.push((name.into(), value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> &[(String, Value)] {
        &self.columns
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

/// Input schema recorded alongside the model at training time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub inputs: Vec<ColumnSpec>,
}

impl Signature {
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|c| c.name == name)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.inputs.is_empty() {
            return Err("signature must declare at least one input".to_string());
        }
        for (idx, column) in self.inputs.iter().enumerate() {
            if column.name.trim().is_empty() {
                return Err(format!("signature input[{idx}] has an empty name"));
            }
            if self.index_of(&column.name) != Some(idx) {
                return Err(format!("signature declares '{}' twice", column.name));
            }
        }
        Ok(())
    }

    /// Strict schema enforcement: same column set, exact types, no widening.
    ///
    /// Returns the row's values in signature order.
    pub fn enforce<'a>(&self, row: &'a Row) -> Result<Vec<&'a Value>> {
        if let Some((extra, _)) = row
            .columns()
            .iter()
            .find(|(name, _)| self.index_of(name).is_none())
        {
            return Err(ConsumoError::Inference(format!(
                "unexpected input column '{extra}'"
            )));
        }

        self.inputs
            .iter()
            .map(|spec| {
                let value = row.get(&spec.name).ok_or_else(|| {
                    ConsumoError::Inference(format!("missing input column '{}'", spec.name))
                })?;
                if value.column_type() != spec.ty {
                    return Err(ConsumoError::Inference(format!(
                        "column '{}' expects {}, got {}",
                        spec.name,
                        spec.ty,
                        value.column_type()
                    )));
                }
                Ok(value)
            })
            .collect()
    }
}
