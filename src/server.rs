//! HTTP surface: `POST /setup` and `GET /health`

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::application::{ApplicationError, SetupRequestBody, SetupUseCase};
use crate::infrastructure::generation::GeneratorRegistry;
use crate::infrastructure::publish::build_publisher;
use crate::orchestrator::{
    ErrorKind, OrchestratorConfig, SetupOrchestrator, SetupRejection, SetupStatus,
};
use crate::publish::PublishError;
use crate::sdk_config::ConfigBuilder;
use crate::settings::{AppConfig, PublisherKind};

/// Uploaded specs can be large; axum's default limit is 2 MiB
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    setup: SetupUseCase,
}

impl AppState {
    pub fn new(setup: SetupUseCase) -> Self {
        Self { setup }
    }

    pub fn setup_use_case(&self) -> &SetupUseCase {
        &self.setup
    }

    /// Wire the registry, publisher and orchestrator described by `config`
    pub fn from_config(config: &AppConfig) -> Result<Self, PublishError> {
        let publisher = build_publisher(&config.publisher)?;
        let owner = match config.publisher.kind {
            PublisherKind::GitHub => config.publisher.github.owner.clone(),
            PublisherKind::Filesystem | PublisherKind::Memory => None,
        };
        let orchestrator = SetupOrchestrator::new(
            Arc::new(GeneratorRegistry::new()),
            publisher,
            ConfigBuilder::new(owner),
            OrchestratorConfig::from(&config.orchestrator),
        );
        Ok(Self::new(SetupUseCase::new(
            Arc::new(orchestrator),
            config.server.request_timeout(),
        )))
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/setup", post(setup))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `router` until `shutdown` is cancelled
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{addr}");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn setup(
    State(state): State<AppState>,
    payload: Result<Json<SetupRequestBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let rejection = SetupRejection::new(ErrorKind::InvalidRequest, rejection.body_text());
            return ApplicationError::from(rejection).into_response();
        }
    };

    // Cancels the run if the client disconnects and this future is dropped
    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    match state.setup.execute(body, cancel).await {
        Ok(response) => {
            let status = match response.status {
                SetupStatus::Success => StatusCode::OK,
                SetupStatus::Partial | SetupStatus::Failed => StatusCode::MULTI_STATUS,
            };
            (status, Json(response)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::publish::InMemoryPublisher;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn router() -> Router {
        let orchestrator = SetupOrchestrator::new(
            Arc::new(GeneratorRegistry::new()),
            Arc::new(InMemoryPublisher::new()),
            ConfigBuilder::default(),
            OrchestratorConfig::default(),
        );
        create_router(AppState::new(SetupUseCase::new(
            Arc::new(orchestrator),
            Duration::from_secs(30),
        )))
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_request() {
        let response = router()
            .oneshot(
                Request::post("/setup")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"company_name": "Acme"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["kind"], "invalid_request");
    }

    #[test]
    fn test_from_config_builds_filesystem_state() {
        assert!(AppState::from_config(&AppConfig::default()).is_ok());
    }
}
