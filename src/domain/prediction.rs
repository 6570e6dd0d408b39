use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(deserialize_with = "lax_int")]
    pub dia: i64,
    #[serde(deserialize_with = "lax_int")]
    pub mes: i64,
    pub cups_municipio: String,
    pub cups_distribuidor: String,
}

/// Body of a successful `POST /predict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(rename = "prediccion_kWh")]
    pub prediccion_kwh: i64,
}

/// Integers, integral floats (`5.0`) and integer strings (`"5"`).
fn lax_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct LaxInt;

    impl<'de> Visitor<'de> for LaxInt {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a valid integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::custom(format!("integer {v} is out of range")))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            // 2^63 is exactly representable; anything at or above it is out of range
            if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
                Ok(v as i64)
            } else {
                Err(E::custom(format!(
                    "expected an integer, got a number with a fractional part: {v}"
                )))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.trim()
                .parse::<i64>()
                .map_err(|_| E::custom(format!("unable to parse string as an integer: {v:?}")))
        }
    }

    deserializer.deserialize_any(LaxInt)
}
