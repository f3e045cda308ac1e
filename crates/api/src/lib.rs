mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arogya_agents::{HealthWorkflow, WorkflowConfig};
use arogya_core::WorkflowError;
use arogya_observability::{AppMetrics, MetricsSnapshot};
use arogya_providers::{Ports, ProviderConfig};
use axum::extract::{Json, State};
use axum::http::{Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use crate::rate_limit::IpRateLimiter;

const MAX_QUERY_CHARS: usize = 4_000;
const MAX_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub bind: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: "dev-arogya-key".to_string(),
            bind: "0.0.0.0:8080".to_string(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 30,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let get = |key: &str| {
            env::var(key)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            api_key: get("AROGYA_API_KEY").unwrap_or(defaults.api_key),
            bind: get("AROGYA_BIND").unwrap_or(defaults.bind),
            rate_limit_window: get("AROGYA_API_RATE_LIMIT_WINDOW_SECONDS")
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            rate_limit_max: get("AROGYA_API_RATE_LIMIT_MAX")
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(defaults.rate_limit_max),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub workflow: Arc<HealthWorkflow>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub limiter: IpRateLimiter,
    pub search_backend: &'static str,
}

impl ApiState {
    pub fn new(workflow: HealthWorkflow, config: &ApiConfig, search_backend: &'static str) -> Self {
        Self {
            metrics: workflow.metrics(),
            workflow: Arc::new(workflow),
            api_key: config.api_key.clone(),
            limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
            search_backend,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    search_backend: &'static str,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    text: String,
    #[serde(default)]
    context: Option<String>,
}

/// Resolves provider ports and wires the workflow behind the router.
pub fn build_app(providers: &ProviderConfig, api: &ApiConfig) -> Result<Router> {
    let ports = Ports::from_config(providers)?;
    let workflow = HealthWorkflow::new(
        ports.generation,
        ports.search,
        WorkflowConfig {
            search_max_results: providers.search_max_results,
            ..WorkflowConfig::default()
        },
        AppMetrics::shared(),
    );

    Ok(build_router(ApiState::new(
        workflow,
        api,
        ports.search_backend.as_str(),
    )))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/metrics", get(metrics))
        .route("/v1/query", post(query))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        search_backend: state.search_backend,
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn metrics(State(state): State<ApiState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.metrics.snapshot()))
}

async fn query(State(state): State<ApiState>, Json(request): Json<QueryRequest>) -> Response {
    let text = request.text.trim();
    if text.is_empty() {
        return bad_request("text must not be empty");
    }
    if text.chars().count() > MAX_QUERY_CHARS {
        return bad_request("text exceeds 4000 characters");
    }

    match state.workflow.run(text, request.context).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => workflow_unavailable(&error),
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "invalid_query",
            "message": message
        })),
    )
        .into_response()
}

fn workflow_unavailable(error: &WorkflowError) -> Response {
    warn!(stage = error.stage(), error = %error.failure(), "query failed");
    (
        StatusCode::BAD_GATEWAY,
        Json(serde_json::json!({
            "error": "workflow_unavailable",
            "message": error.to_string()
        })),
    )
        .into_response()
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if request.method() == Method::OPTIONS || is_public_endpoint(path.as_str()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        info!(path = %path, "rejected request without a valid api key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "unauthorized",
                "message": "missing or invalid x-api-key"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if !state.limiter.allow(&ip) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "rate limit exceeded for this IP"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health")
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "local".to_string())
}
