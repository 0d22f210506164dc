use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use strata::services::ServiceError;
use strata::store::paths::parse_version_dir;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Serialize)]
pub struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    code: String,
    message: String,
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
        },
    };
    (status, Json(body)).into_response()
}

fn service_error_response(e: ServiceError) -> Response {
    match e {
        ServiceError::NotFound(msg) | ServiceError::Validation(msg) => {
            error_response(StatusCode::NOT_FOUND, "not_found", &msg)
        },
        e => {
            tracing::error!(error = %e, "request failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                &e.to_string(),
            )
        },
    }
}

/// Artifact bytes with headers that let any page embed them in an iframe
fn html_response(content: Vec<u8>, cache_control: &'static str) -> Response {
    let mut response = content.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("frame-ancestors *"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    response
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn list_workspaces(State(state): State<AppState>) -> Response {
    match state.repository.list_workspaces().await {
        Ok(workspaces) => Json(serde_json::json!({"workspaces": workspaces})).into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn list_workspace(State(state): State<AppState>, Path(workspace): Path<String>) -> Response {
    match state.repository.list_artifacts(&workspace).await {
        Ok(artifacts) => Json(serde_json::json!({
            "workspace": workspace,
            "artifacts": artifacts,
        }))
        .into_response(),
        Err(e) => service_error_response(e),
    }
}

async fn serve_latest(
    State(state): State<AppState>,
    Path((workspace, id)): Path<(String, String)>,
) -> Response {
    match state.repository.read(&workspace, &id, None).await {
        Ok(content) => html_response(content, "no-cache"),
        Err(e) => service_error_response(e),
    }
}

async fn serve_version(
    State(state): State<AppState>,
    Path((workspace, id, segment)): Path<(String, String, String)>,
) -> Response {
    let Some(version) = parse_version_dir(&segment) else {
        return error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            &format!("'{}' is not a version (expected v<N>)", segment),
        );
    };

    match state.repository.read(&workspace, &id, Some(version)).await {
        // Versions never change once written.
        Ok(content) => html_response(content, "public, max-age=31536000, immutable"),
        Err(e) => service_error_response(e),
    }
}

/// Artifact pages are addressed with a trailing slash so relative links resolve inside them
async fn add_trailing_slash(uri: Uri) -> Redirect {
    Redirect::permanent(&format!("{}/", uri.path()))
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS]);

    Router::new()
        .route("/health", get(health))
        .route("/", get(list_workspaces))
        .route("/{workspace}", get(list_workspace))
        .route("/{workspace}/", get(list_workspace))
        .route("/{workspace}/{id}", get(add_trailing_slash))
        .route("/{workspace}/{id}/", get(serve_latest))
        .route("/{workspace}/{id}/{version}", get(add_trailing_slash))
        .route("/{workspace}/{id}/{version}/", get(serve_version))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
