use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use webinstall_common::{InstallStep, StepDescriptor, StepOutcome, StepParams, StepResponse};

use crate::steps::Installer;
use crate::util::escape_html;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub installer: Arc<Installer>,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

/// Request-level failures. Rendered in the step response shape so a client
/// always finds `success` and `messages`.
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        let body = StepResponse::from(StepOutcome::danger(message));
        (status, Json(body)).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(index))
        .route("/api/steps", get(list_steps))
        .route("/api/install/{step}", post(run_step))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn index() -> Html<String> {
    let items: String = InstallStep::ALL
        .iter()
        .map(|step| {
            format!(
                "<li><code>POST /api/install/{}</code> {}</li>",
                step.name(),
                escape_html(step.label())
            )
        })
        .collect();
    Html(format!(
        "<!DOCTYPE html><html><head><title>Installer</title></head><body><h1>Installer</h1><ol>{}</ol></body></html>",
        items
    ))
}

async fn list_steps() -> Json<Vec<StepDescriptor>> {
    Json(InstallStep::ALL.iter().map(|s| s.descriptor()).collect())
}

async fn run_step(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<StepResponse>, ApiError> {
    let step: InstallStep = name
        .parse()
        .map_err(|e: webinstall_common::UnknownStep| ApiError::NotFound(e.to_string()))?;

    let params = if body.iter().all(u8::is_ascii_whitespace) {
        StepParams::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let outcome = state.installer.execute(step, &params).await;
    Ok(Json(outcome.into()))
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AppFixture, FRESH_ENV};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(app: AppFixture) -> (Router, tempfile::TempDir) {
        let state = Arc::new(AppState {
            installer: Arc::new(app.installer),
        });
        (api_router().with_state(state), app.dir)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _dir) = test_app(AppFixture::new());
        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_list_steps() {
        let (app, _dir) = test_app(AppFixture::new());
        let request = Request::builder()
            .uri("/api/steps")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let steps: Vec<StepDescriptor> = body_json(response.into_body()).await;
        let names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["configure", "migrate", "create-admin", "install-package", "finish"]
        );
        assert_eq!(steps[2].position, 2);
    }

    #[tokio::test]
    async fn test_run_step_success() {
        let (app, _dir) = test_app(AppFixture::new());
        let response = app
            .oneshot(post("/api/install/migrate", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["messages"]["success"][0], "Installation successful");
    }

    #[tokio::test]
    async fn test_run_step_legacy_name() {
        let (app, _dir) = test_app(AppFixture::new());
        let response = app
            .oneshot(post("/api/install/executeFusioMigration", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: StepResponse = body_json(response.into_body()).await;
        assert!(body.success);
    }

    #[tokio::test]
    async fn test_configure_warning_is_200() {
        let (app, dir) = test_app(AppFixture::new());
        let response = app
            .oneshot(post(
                "/api/install/configure",
                r#"{"url": "https://example.com", "db_host": "localhost", "db_name": "f"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["messages"]["warning"][0],
            "Project key must contain a value"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join(".env")).unwrap(),
            FRESH_ENV
        );
    }

    #[tokio::test]
    async fn test_unknown_step_is_404() {
        let (app, _dir) = test_app(AppFixture::new());
        let response = app
            .oneshot(post("/api/install/dropDatabase", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["messages"]["danger"][0],
            "Unknown installation step 'dropDatabase'"
        );
    }

    #[tokio::test]
    async fn test_invalid_body_is_400() {
        let (app, _dir) = test_app(AppFixture::new());
        let response = app
            .oneshot(post("/api/install/configure", "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: StepResponse = body_json(response.into_body()).await;
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_get_on_step_is_rejected() {
        let (app, _dir) = test_app(AppFixture::new());
        let request = Request::builder()
            .uri("/api/install/migrate")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
