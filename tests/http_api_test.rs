//! `POST /setup` through the router, without binding a socket

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use sdkforge::application::SetupUseCase;
use sdkforge::infrastructure::generation::GeneratorRegistry;
use sdkforge::infrastructure::publish::{FileSystemPublisher, InMemoryPublisher};
use sdkforge::orchestrator::{OrchestratorConfig, RetryPolicy, SetupOrchestrator};
use sdkforge::publish::Publisher;
use sdkforge::sdk_config::ConfigBuilder;
use sdkforge::server::{AppState, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const MINIMAL: &str = include_str!("fixtures/openapi/minimal.yaml");
const PETSTORE: &str = include_str!("fixtures/openapi/petstore.json");

fn router_with(publisher: Arc<dyn Publisher>) -> Router {
    let orchestrator = SetupOrchestrator::new(
        Arc::new(GeneratorRegistry::new()),
        publisher,
        ConfigBuilder::new(Some("octo".to_string())),
        OrchestratorConfig {
            max_fan_out: 2,
            retry: RetryPolicy::none(),
        },
    );
    create_router(AppState::new(SetupUseCase::new(
        Arc::new(orchestrator),
        Duration::from_secs(30),
    )))
}

async fn post_setup(router: Router, body: Value) -> Response {
    router
        .oneshot(
            Request::post("/setup")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_setup_success_response_shape() {
    let publisher = Arc::new(InMemoryPublisher::new());
    let response = post_setup(
        router_with(publisher.clone()),
        json!({
            "company_name": "Acme",
            "openapi_spec": MINIMAL,
            "languages": ["python", "typescript"],
            "filename": "openapi.yaml"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["repos"]["config"], "memory://repos/acme-config");
    assert_eq!(
        body["repos"]["sdks"],
        json!({
            "python": "memory://repos/acme-python-sdk",
            "typescript": "memory://repos/acme-typescript-sdk"
        })
    );
    assert_eq!(body["fingerprint"].as_str().unwrap().len(), 64);
    assert!(body["request_id"].is_string());
    assert_eq!(publisher.publish_count(), 3);
}

#[tokio::test]
async fn test_empty_spec_is_unprocessable() {
    let publisher = Arc::new(InMemoryPublisher::new());
    let response = post_setup(
        router_with(publisher.clone()),
        json!({ "company_name": "Acme", "openapi_spec": "", "languages": ["python"] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "parse");
    assert_eq!(publisher.publish_count(), 0);
}

#[tokio::test]
async fn test_unsupported_language_is_bad_request() {
    let publisher = Arc::new(InMemoryPublisher::new());
    let response = post_setup(
        router_with(publisher.clone()),
        json!({
            "company_name": "Acme",
            "openapi_spec": MINIMAL,
            "languages": ["python", "cobol"]
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["kind"], "unsupported_language");
    assert!(body["error"]["message"].as_str().unwrap().contains("cobol"));
    assert_eq!(publisher.publish_count(), 0);
}

#[tokio::test]
async fn test_empty_language_list_is_bad_request() {
    let response = post_setup(
        router_with(Arc::new(InMemoryPublisher::new())),
        json!({ "company_name": "Acme", "openapi_spec": MINIMAL, "languages": [] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["kind"], "invalid_request");
}

#[tokio::test]
async fn test_partial_success_is_multi_status() {
    let spec = PETSTORE.replace(
        r#""Status": { "type": "string", "enum": ["available", "pending", "sold"] }"#,
        r#""Status": { "not": { "type": "integer" } }"#,
    );
    let response = post_setup(
        router_with(Arc::new(InMemoryPublisher::new())),
        json!({
            "company_name": "Acme",
            "openapi_spec": spec,
            "languages": ["typescript", "python"],
            "filename": "petstore.json"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    let body = json_body(response).await;
    assert_eq!(body["status"], "partial");
    assert_eq!(body["repos"]["config"], "memory://repos/acme-config");
    assert_eq!(body["repos"]["sdks"]["python"], "memory://repos/acme-python-sdk");
    assert_eq!(body["repos"]["sdks"]["typescript"]["error"]["kind"], "generation");
}

#[tokio::test]
async fn test_filesystem_publisher_writes_every_repository() {
    let root = tempfile::tempdir().unwrap();
    let publisher = Arc::new(FileSystemPublisher::new(root.path()));

    let response = post_setup(
        router_with(publisher),
        json!({
            "company_name": "Acme Corp",
            "openapi_spec": PETSTORE,
            "languages": ["python", "typescript"],
            "filename": "petstore.json"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let config = body["repos"]["config"].as_str().unwrap();
    assert!(config.starts_with("file://"));
    assert!(config.ends_with("/acme-corp-config/"));

    let config_dir = root.path().join("acme-corp-config");
    let published_spec = std::fs::read_to_string(config_dir.join("fern/openapi.yaml")).unwrap();
    assert_eq!(published_spec.trim(), PETSTORE.trim());
    assert_eq!(
        std::fs::read_to_string(config_dir.join(".description")).unwrap().trim(),
        "SDK configuration for Acme Corp"
    );

    for repo in ["acme-corp-python-sdk", "acme-corp-typescript-sdk"] {
        let dir = root.path().join(repo);
        assert!(dir.is_dir(), "{repo} was not published");
        assert!(std::fs::read_dir(&dir).unwrap().count() > 1);
    }
}
