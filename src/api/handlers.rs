//! API request handlers

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::core::expression::evaluate_str;
use crate::core::{Diagnostic, EvalContext, RecalcEngine};
use crate::types::Test;

use super::server::AppState;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Root endpoint response
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(RootResponse {
        name: "labcalc API server".to_string(),
        version: state.version.clone(),
        description: "Recalculates lab test parameters and indicators".to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check endpoint"),
            EndpointInfo::new("GET", "/version", "Get server version"),
            EndpointInfo::new(
                "POST",
                "/api/v1/recalculate",
                "Recalculate values and indicators for a list of tests",
            ),
            EndpointInfo::new(
                "POST",
                "/api/v1/evaluate",
                "Evaluate one expression against a name/value context",
            ),
        ],
    }))
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
    }))
}

/// Version response
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: vec!["recalculate".to_string(), "evaluate".to_string()],
    }))
}

/// Recalculate request: the caller's current snapshot
#[derive(Debug, Serialize, Deserialize)]
pub struct RecalculateRequest {
    pub tests: Vec<Test>,
    #[serde(default)]
    pub settings: Option<EngineConfig>,
}

/// Recalculate response
#[derive(Debug, Serialize, Deserialize)]
pub struct RecalculateResponse {
    pub tests: Vec<Test>,
    pub diagnostics: Vec<Diagnostic>,
}

/// POST /api/v1/recalculate - Recalculate a snapshot of tests
pub async fn recalculate(Json(req): Json<RecalculateRequest>) -> impl IntoResponse {
    let engine = RecalcEngine::new(req.settings.unwrap_or_default());
    let report = engine.recalculate_with_report(&req.tests);
    debug!(
        "recalculated {} test(s), {} diagnostic(s)",
        report.tests.len(),
        report.diagnostics.len()
    );

    Json(ApiResponse::ok(RecalculateResponse {
        tests: report.tests,
        diagnostics: report.diagnostics,
    }))
}

/// Evaluate request
#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub expression: String,
    #[serde(default)]
    pub context: HashMap<String, f64>,
    #[serde(default)]
    pub settings: Option<EngineConfig>,
}

/// Evaluate response
#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub value: f64,
    /// Value rounded for display at the configured precision
    pub display: String,
}

/// POST /api/v1/evaluate - Evaluate one expression
pub async fn evaluate(Json(req): Json<EvaluateRequest>) -> impl IntoResponse {
    let config = req.settings.unwrap_or_default();
    let ctx: EvalContext = req.context.into_iter().collect();

    match evaluate_str(&req.expression, &ctx, config.missing_reference) {
        Ok(value) => (
            StatusCode::OK,
            Json(ApiResponse::ok(EvaluateResponse {
                value,
                display: config.format_value(value),
            })),
        ),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::err(e.to_string())),
        ),
    }
}
