// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Churn prediction backend seam.
//!
//! The API forwards prediction requests to a [`PredictionService`]. No model
//! ships with this crate; [`UnavailablePredictionService`] is installed by
//! default and answers every request with `Unavailable`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Features of one customer to score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictionRequest {
    /// Caller's customer identifier, echoed in the outcome
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Model input, passed to the backend unchanged
    #[schema(value_type = Object)]
    pub features: serde_json::Value,
}

impl PredictionRequest {
    /// Reject inputs no backend can score.
    pub fn validate(&self) -> Result<(), PredictionError> {
        match &self.features {
            serde_json::Value::Object(map) if !map.is_empty() => Ok(()),
            serde_json::Value::Object(_) => Err(PredictionError::InvalidInput(
                "features must not be empty".to_string(),
            )),
            _ => Err(PredictionError::InvalidInput(
                "features must be a JSON object".to_string(),
            )),
        }
    }
}

/// Result of scoring one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictionOutcome {
    /// Customer identifier echoed from the request, if it carried one
    pub customer_id: Option<String>,
    /// Probability in `[0, 1]` that the customer churns
    pub churn_probability: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("prediction backend unavailable")]
    Unavailable,

    #[error("invalid prediction input: {0}")]
    InvalidInput(String),
}

/// A churn scoring backend.
pub trait PredictionService: Send + Sync {
    /// Score `request` on behalf of `requested_by`.
    fn predict(
        &self,
        requested_by: &str,
        request: &PredictionRequest,
    ) -> Result<PredictionOutcome, PredictionError>;
}

/// Placeholder backend used when no model is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailablePredictionService;

impl PredictionService for UnavailablePredictionService {
    fn predict(
        &self,
        requested_by: &str,
        _request: &PredictionRequest,
    ) -> Result<PredictionOutcome, PredictionError> {
        tracing::debug!(
            user = %requested_by,
            "Prediction requested but no backend is configured"
        );
        Err(PredictionError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_backend_always_refuses() {
        let service = UnavailablePredictionService;
        let request = PredictionRequest {
            customer_id: Some("C-1".to_string()),
            features: serde_json::json!({"tenure": 12}),
        };
        let result = service.predict("analyst", &request);
        assert!(matches!(result, Err(PredictionError::Unavailable)));
    }

    #[test]
    fn features_must_be_a_non_empty_object() {
        let request = |features| PredictionRequest {
            customer_id: None,
            features,
        };

        assert!(request(serde_json::json!({"tenure": 12})).validate().is_ok());
        assert!(matches!(
            request(serde_json::json!({})).validate(),
            Err(PredictionError::InvalidInput(_))
        ));
        assert!(matches!(
            request(serde_json::json!([1, 2, 3])).validate(),
            Err(PredictionError::InvalidInput(_))
        ));
        assert!(matches!(
            request(serde_json::Value::Null).validate(),
            Err(PredictionError::InvalidInput(_))
        ));
    }
}
