// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Churn prediction and prediction history endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AdminOnly, Auth};
use crate::error::ApiError;
use crate::prediction::{PredictionOutcome, PredictionRequest};
use crate::state::AppState;
use crate::storage::PredictionRecord;

const DEFAULT_PAGE_SIZE: usize = 100;
const MAX_PAGE_SIZE: usize = 1000;

/// One served prediction.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEntry {
    pub id: String,
    /// Account that requested the prediction
    pub username: String,
    pub customer_id: Option<String>,
    pub churn_probability: f64,
    /// Model input as submitted
    #[schema(value_type = Object)]
    pub features: serde_json::Value,
    pub predicted_at: DateTime<Utc>,
}

impl From<PredictionRecord> for HistoryEntry {
    fn from(record: PredictionRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            customer_id: record.customer_id,
            churn_probability: record.churn_probability,
            features: record.features,
            predicted_at: record.predicted_at,
        }
    }
}

/// Query parameters for the full history.
#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryPageQuery {
    /// Zero-based page index (default: 0)
    #[param(default = 0)]
    pub page: Option<usize>,
    /// Page size (default: 100, capped at 1000)
    #[param(default = 100)]
    pub size: Option<usize>,
}

/// One page of the full history.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryPage {
    pub items: Vec<HistoryEntry>,
    pub total_elements: usize,
    pub total_pages: usize,
    pub page: usize,
    pub size: usize,
}

/// Score one customer's features.
///
/// The features are forwarded to the configured prediction backend
/// unchanged, and the outcome is recorded in the caller's history.
#[utoipa::path(
    post,
    path = "/api/churn/predict",
    tag = "Churn",
    security(("bearer" = [])),
    request_body = PredictionRequest,
    responses(
        (status = 200, description = "Prediction", body = PredictionOutcome),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Features missing or not a JSON object"),
        (status = 503, description = "No prediction backend configured")
    )
)]
pub async fn predict(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionOutcome>, ApiError> {
    request.validate()?;
    let outcome = state.predictor.predict(&user.username, &request)?;

    let record = PredictionRecord::new(&user.username, &request, &outcome);
    state.users.record_prediction(&record)?;

    tracing::info!(
        user = %user.username,
        prediction = %record.id,
        churn_probability = outcome.churn_probability,
        "Prediction served"
    );
    Ok(Json(outcome))
}

/// The caller's own predictions, newest first.
#[utoipa::path(
    get,
    path = "/api/churn/history",
    tag = "Churn",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's prediction history", body = Vec<HistoryEntry>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn history(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let entries = state
        .users
        .predictions_for(&user.username)?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(entries))
}

/// Every account's predictions, newest first (admin only).
#[utoipa::path(
    get,
    path = "/api/churn/history/all",
    tag = "Churn",
    params(HistoryPageQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "One page of the full history", body = HistoryPage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin role required")
    )
)]
pub async fn all_history(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Query(query): Query<HistoryPageQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let page = query.page.unwrap_or(0);
    let size = query
        .size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    tracing::debug!(admin = %admin.username, page, size, "Listing full prediction history");

    let records = state.users.all_predictions()?;
    let total_elements = records.len();
    let items = records
        .into_iter()
        .skip(page.saturating_mul(size))
        .take(size)
        .map(Into::into)
        .collect();

    Ok(Json(HistoryPage {
        items,
        total_elements,
        total_pages: total_elements.div_ceil(size),
        page,
        size,
    }))
}
