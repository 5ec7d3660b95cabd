use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use utoipa::OpenApi;

use crate::{responses, AppState};

/// Health probe; touches the book store.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Meta",
    responses(
        (status = 200, description = "Service healthy", body = crate::openapi::HealthOk),
        (status = 503, description = "Book store unavailable", body = crate::openapi::ProblemDoc)
    )
)]
pub(crate) async fn healthz(State(state): State<AppState>) -> Response {
    match state.kernel().count_async().await {
        Ok(books) => responses::json_ok(json!({"ok": true, "books": books})),
        Err(err) => {
            tracing::warn!(error = %err, "health probe failed");
            responses::problem(StatusCode::SERVICE_UNAVAILABLE, Some("book store unavailable"))
        }
    }
}

/// Service name, version and route list.
#[utoipa::path(
    get,
    path = "/about",
    tag = "Meta",
    responses((status = 200, description = "About", body = crate::openapi::AboutResponse))
)]
pub(crate) async fn about(State(state): State<AppState>) -> Response {
    responses::json_ok(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": state.endpoints(),
    }))
}

pub(crate) async fn spec_openapi() -> Response {
    match crate::openapi::ApiDoc::openapi().to_pretty_json() {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => responses::problem(StatusCode::INTERNAL_SERVER_ERROR, Some(&err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tempfile::tempdir;
    use tower::util::ServiceExt;

    async fn get_json(path: &str) -> (StatusCode, Value) {
        let dir = tempdir().unwrap();
        let kernel = booklib_kernel::Kernel::open_with(dir.path(), Default::default()).unwrap();
        let (routes, endpoints) = router::build_router();
        let app = routes.with_state(AppState::new(kernel).with_endpoints(endpoints));
        let resp = app
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn healthz_reports_book_count() {
        let (status, body) = get_json("/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true, "books": 0}));
    }

    #[tokio::test]
    async fn about_lists_routes() {
        let (status, body) = get_json("/about").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "booklib-server");
        let endpoints = body["endpoints"].as_array().unwrap();
        assert!(endpoints.contains(&json!("PATCH /api/v1/book/{id}")));
    }

    #[tokio::test]
    async fn serves_openapi_document() {
        let (status, body) = get_json("/spec/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"].get("/api/v1/book").is_some());
    }
}
