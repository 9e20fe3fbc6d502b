// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{
    http::{
        header::{self, HeaderName},
        HeaderValue, Method,
    },
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{middleware::authenticate, policy::enforce, Role},
    prediction::{PredictionOutcome, PredictionRequest},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod churn;
pub mod health;
pub mod users;

const REQUEST_ID_HEADER: &str = "x-request-id";
const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// Build the application router.
///
/// Layers, outermost first: CORS, request id, access log, gatekeeper,
/// access policy.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let http_layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(PropagateRequestIdLayer::new(request_id))
        .layer(TraceLayer::new_for_http());

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/validate", get(auth::validate))
        .route("/api/users/me", get(users::get_current_user))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/churn/predict", post(churn::predict))
        .route("/api/churn/history", get(churn::history))
        .route("/api/churn/history/all", get(churn::all_history))
        .route("/actuator/health", get(health::health))
        .merge(
            SwaggerUi::new("/swagger-ui").url("/v3/api-docs/openapi.json", ApiDoc::openapi()),
        )
        // Runs second: authorization against the installed identity
        .layer(from_fn_with_state(state.clone(), enforce))
        // Runs first: attach identity, never reject
        .layer(from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
        .layer(http_layers)
        .layer(cors_layer(allowed_origins))
}

/// CORS policy for the browser front end.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::CACHE_CONTROL])
        .expose_headers([header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::register,
        auth::forgot_password,
        auth::reset_password,
        auth::validate,
        users::get_current_user,
        admin::list_users,
        churn::predict,
        churn::history,
        churn::all_history,
        health::health
    ),
    components(
        schemas(
            Role,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RegisterRequest,
            auth::RegisterResponse,
            auth::ForgotPasswordRequest,
            auth::ForgotPasswordResponse,
            auth::ResetPasswordRequest,
            auth::MessageResponse,
            auth::ValidateResponse,
            users::UserMeResponse,
            admin::UserSummary,
            admin::UserListResponse,
            PredictionRequest,
            PredictionOutcome,
            churn::HistoryEntry,
            churn::HistoryPage,
            health::HealthResponse,
            health::HealthChecks
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, registration and password reset"),
        (name = "Users", description = "Current user"),
        (name = "Admin", description = "Account administration"),
        (name = "Churn", description = "Churn prediction and history"),
        (name = "Health", description = "Liveness and dependency checks")
    )
)]
struct ApiDoc;
