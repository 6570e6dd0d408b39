//! The prediction service: one write-once model handle, read by every request.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::domain::{PredictRequest, PredictResponse};
use crate::error::{ConsumoError, LoadError, Result};
use crate::ml::{LoadedModel, ModelInfo, Row, Value};

/// Liveness as reported by `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Ko,
}

/// Terminal state reached after the single startup load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Ready,
    Degraded,
}

pub struct PredictionService {
    model: Option<LoadedModel>,
}

impl PredictionService {
    pub fn ready(model: LoadedModel) -> Self {
        Self { model: Some(model) }
    }

    pub fn degraded() -> Self {
        Self { model: None }
    }

    /// Map the startup load outcome onto READY/DEGRADED. A failed load is
    /// logged and never propagated.
    pub fn from_load_result(result: std::result::Result<LoadedModel, LoadError>) -> Self {
        match result {
            Ok(model) => {
                info!(
                    source = %model.info.source_uri,
                    name = model.info.name.as_deref().unwrap_or("-"),
                    version = model.info.version.as_deref().unwrap_or("-"),
                    "model loaded, service ready"
                );
                Self::ready(model)
            }
            Err(e) => {
                error!(error = %e, "model load failed, serving in degraded mode");
                Self::degraded()
            }
        }
    }

    pub fn state(&self) -> ModelState {
        if self.model.is_some() {
            ModelState::Ready
        } else {
            ModelState::Degraded
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ModelState::Ready
    }

    pub fn health(&self) -> HealthStatus {
        match self.state() {
            ModelState::Ready => HealthStatus::Ok,
            ModelState::Degraded => HealthStatus::Ko,
        }
    }

    pub fn model_info(&self) -> Option<&ModelInfo> {
        self.model.as_ref().map(|m| &m.info)
    }

    /// Synchronous, CPU-bound; callers on an async runtime should move it
    /// to the blocking pool.
    pub fn predict(&self, request: &PredictRequest) -> Result<PredictResponse> {
        let model = self.model.as_ref().ok_or(ConsumoError::ModelUnavailable)?;

        let row = build_input(request)?;
        let outputs = model.model.predict(std::slice::from_ref(&row))?;
        let log_kwh = outputs
            .first()
            .copied()
            .ok_or_else(|| ConsumoError::Inference("model returned no predictions".to_string()))?;

        Ok(PredictResponse {
            prediccion_kwh: expm1_to_kwh(log_kwh)?,
        })
    }
}

/// Single-row model input; day and month narrowed to the int32 columns the
/// model was trained on.
pub fn build_input(request: &PredictRequest) -> Result<Row> {
    Ok(Row::new()
        .with("dia", Value::Int32(to_int32("dia", request.dia)?))
        .with("mes", Value::Int32(to_int32("mes", request.mes)?))
        .with("cups_municipio", Value::Str(request.cups_municipio.clone()))
        .with(
            "cups_distribuidor",
            Value::Str(request.cups_distribuidor.clone()),
        ))
}

fn to_int32(field: &str, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        ConsumoError::Validation(format!("{field}={value} does not fit in a 32-bit integer"))
    })
}

/// Invert the log1p target transform and truncate toward zero.
///
/// No clamping: a negative log-value yields a negative consumption.
pub fn expm1_to_kwh(log_value: f64) -> Result<i64> {
    let kwh = log_value.exp_m1();
    if !kwh.is_finite() || kwh >= i64::MAX as f64 || kwh < i64::MIN as f64 {
        return Err(ConsumoError::Inference(format!(
            "prediction {log_value} does not map to an integer kWh value"
        )));
    }
    Ok(kwh.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{Flavor, MockRegressor};
    use chrono::Utc;
    use std::sync::Arc;

    fn info() -> ModelInfo {
        ModelInfo {
            name: Some("ÁrbolDecisión".to_string()),
            version: Some("1".to_string()),
            flavor: Flavor::DecisionTree,
            source_uri: "models:/ÁrbolDecisión/1".to_string(),
            loaded_at: Utc::now(),
        }
    }

    fn request() -> PredictRequest {
        PredictRequest {
            dia: 14,
            mes: 2,
            cups_municipio: "28079".to_string(),
            cups_distribuidor: "0021".to_string(),
        }
    }

    fn service_returning(log_value: f64) -> PredictionService {
        let mut mock = MockRegressor::new();
        mock.expect_predict()
            .returning(move |rows| Ok(vec![log_value; rows.len()]));
        PredictionService::ready(LoadedModel::new(Arc::new(mock), info()))
    }

    #[test]
    fn test_expm1_transform() {
        assert_eq!(expm1_to_kwh(0.0).unwrap(), 0);
        assert_eq!(expm1_to_kwh(0.7).unwrap(), 1);
        assert_eq!(expm1_to_kwh(2f64.ln()).unwrap(), 1);
        assert_eq!(expm1_to_kwh(5.0).unwrap(), 147);
    }

    #[test]
    fn test_expm1_truncates_negative_toward_zero() {
        // exp(-0.5) - 1 = -0.393...
        assert_eq!(expm1_to_kwh(-0.5).unwrap(), 0);
        // exp(-10) - 1 = -0.99995...
        assert_eq!(expm1_to_kwh(-10.0).unwrap(), 0);
        assert_eq!(expm1_to_kwh(f64::NEG_INFINITY).unwrap(), -1);
    }

    #[test]
    fn test_expm1_overflow_is_inference_error() {
        assert!(matches!(
            expm1_to_kwh(1000.0),
            Err(ConsumoError::Inference(_))
        ));
        assert!(matches!(
            expm1_to_kwh(f64::NAN),
            Err(ConsumoError::Inference(_))
        ));
    }

    #[test]
    fn test_build_input_coerces_to_int32() {
        let row = build_input(&request()).unwrap();
        let names: Vec<&str> = row.columns().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["dia", "mes", "cups_municipio", "cups_distribuidor"]);
        assert_eq!(row.get("dia"), Some(&Value::Int32(14)));
        assert_eq!(row.get("mes"), Some(&Value::Int32(2)));
    }

    #[test]
    fn test_build_input_out_of_range() {
        let mut req = request();
        req.dia = i64::from(i32::MAX) + 1;
        assert!(matches!(
            build_input(&req),
            Err(ConsumoError::Validation(_))
        ));
    }

    #[test]
    fn test_ready_service_predicts() {
        let service = service_returning(5.0);
        assert_eq!(service.state(), ModelState::Ready);
        assert_eq!(service.health(), HealthStatus::Ok);
        assert_eq!(service.predict(&request()).unwrap().prediccion_kwh, 147);
    }

    #[test]
    fn test_model_receives_single_int32_row() {
        let mut mock = MockRegressor::new();
        mock.expect_predict()
            .withf(|rows| {
                rows.len() == 1
                    && rows[0].get("dia") == Some(&Value::Int32(14))
                    && rows[0].get("mes") == Some(&Value::Int32(2))
                    && rows[0].get("cups_municipio") == Some(&Value::Str("28079".to_string()))
            })
            .times(1)
            .returning(|_| Ok(vec![0.0]));
        let service = PredictionService::ready(LoadedModel::new(Arc::new(mock), info()));

        assert_eq!(service.predict(&request()).unwrap().prediccion_kwh, 0);
    }

    #[test]
    fn test_degraded_service_never_calls_model() {
        let service = PredictionService::from_load_result(Err(LoadError::MissingRegistryHost));
        assert_eq!(service.state(), ModelState::Degraded);
        assert_eq!(service.health(), HealthStatus::Ko);
        assert!(service.model_info().is_none());

        let err = service.predict(&request()).unwrap_err();
        assert!(matches!(err, ConsumoError::ModelUnavailable));
        assert_eq!(err.to_string(), "Modelo no cargado");
    }

    #[test]
    fn test_empty_model_output() {
        let mut mock = MockRegressor::new();
        mock.expect_predict().returning(|_| Ok(Vec::new()));
        let service = PredictionService::ready(LoadedModel::new(Arc::new(mock), info()));
        assert!(matches!(
            service.predict(&request()),
            Err(ConsumoError::Inference(_))
        ));
    }

    #[test]
    fn test_model_error_propagates() {
        let mut mock = MockRegressor::new();
        mock.expect_predict()
            .returning(|_| Err(ConsumoError::Inference("unseen category".to_string())));
        let service = PredictionService::ready(LoadedModel::new(Arc::new(mock), info()));
        let err = service.predict(&request()).unwrap_err();
        assert!(err.to_string().contains("unseen category"));
    }

    #[test]
    fn test_repeated_requests_are_identical() {
        let service = service_returning(3.2);
        let first = service.predict(&request()).unwrap();
        for _ in 0..10 {
            assert_eq!(service.predict(&request()).unwrap(), first);
        }
    }
}
