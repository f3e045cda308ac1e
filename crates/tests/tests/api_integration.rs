mod common;

use std::time::Duration;

use arogya_api::{build_router, ApiConfig, ApiState};
use arogya_core::GenerationFailure;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{emergency_record, harness, ScriptedGenerator};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(generation: ScriptedGenerator) -> Router {
    app_with(generation, ApiConfig::default())
}

fn app_with(generation: ScriptedGenerator, config: ApiConfig) -> Router {
    let h = harness(generation);
    build_router(ApiState::new(h.workflow, &config, "scripted"))
}

fn query_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/query")
        .header("content-type", "application/json")
        .header("x-api-key", "dev-arogya-key")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = app(ScriptedGenerator::routing("ayush_support"));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["search_backend"], json!("scripted"));
    assert_eq!(body["metrics"]["runs_total"], json!(0));
}

#[tokio::test]
async fn query_requires_api_key() {
    let app = app(ScriptedGenerator::routing("ayush_support"));

    let request = Request::builder()
        .method("POST")
        .uri("/v1/query")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "text": "neem for acne" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn query_returns_the_workflow_result() {
    let app = app(ScriptedGenerator::routing("symptom_checker").symptoms(emergency_record()));

    let response = app
        .oneshot(query_request(json!({
            "text": "I have chest pain and shortness of breath"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["intent"], json!("symptom_checker"));
    assert_eq!(body["output"]["emergency"], json!(true));
    assert_eq!(body["emergency_number"], json!("112 (India Emergency Services)"));
    assert!(body.get("general_guidance").is_none());
}

#[tokio::test]
async fn blocked_queries_are_a_normal_response() {
    let app = app(
        ScriptedGenerator::routing("symptom_checker")
            .unsafe_verdict("weapon instructions", "harm_to_others"),
    );

    let response = app
        .oneshot(query_request(json!({ "text": "how to poison someone" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], json!("blocked"));
    assert_eq!(body["category"], json!("harm_to_others"));
}

#[tokio::test]
async fn invalid_text_is_rejected() {
    let app = app(ScriptedGenerator::routing("ayush_support"));

    let empty = app
        .clone()
        .oneshot(query_request(json!({ "text": "   " })))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let long = app
        .oneshot(query_request(json!({ "text": "a".repeat(4_001) })))
        .await
        .unwrap();
    assert_eq!(long.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gate_failures_surface_as_bad_gateway() {
    let app = app(
        ScriptedGenerator::routing("ayush_support").fail_guardrail(GenerationFailure::Upstream {
            status: 500,
            body: "secret upstream detail".to_string(),
        }),
    );

    let response = app
        .oneshot(query_request(json!({ "text": "triphala dosage" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"], json!("workflow_unavailable"));
    assert!(!body["message"].as_str().unwrap().contains("secret"));
}

#[tokio::test]
async fn metrics_count_runs() {
    let app = app(ScriptedGenerator::routing("weather_forecast"));

    let response = app
        .clone()
        .oneshot(query_request(json!({ "text": "is it sunny", "context": null })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let metrics = app
        .oneshot(
            Request::builder()
                .uri("/v1/metrics")
                .header("x-api-key", "dev-arogya-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(metrics).await;
    assert_eq!(body["runs_total"], json!(1));
    assert_eq!(body["unknown_intent_total"], json!(1));
}

#[tokio::test]
async fn rate_limit_applies_per_client() {
    let config = ApiConfig {
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 1,
        ..ApiConfig::default()
    };
    let app = app_with(ScriptedGenerator::routing("ayush_support"), config);

    let first = app
        .clone()
        .oneshot(query_request(json!({ "text": "amla benefits" })))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(query_request(json!({ "text": "amla benefits" })))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}
