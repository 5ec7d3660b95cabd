use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Problem-details body: `{"type","title","status","detail"?}`.
pub fn problem(status: StatusCode, detail: Option<&str>) -> Response {
    let title = status.canonical_reason().unwrap_or("Error");
    let mut body = json!({"type": "about:blank", "title": title, "status": status.as_u16()});
    if let Some(d) = detail {
        body["detail"] = json!(d);
    }
    (status, Json(body)).into_response()
}

pub fn json_ok(value: Value) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn problem_shape() {
        let resp = problem(StatusCode::NOT_FOUND, Some("gone"));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            v,
            json!({"type": "about:blank", "title": "Not Found", "status": 404, "detail": "gone"})
        );
    }

    #[tokio::test]
    async fn problem_without_detail() {
        let resp = problem(StatusCode::BAD_REQUEST, None);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(v.get("detail").is_none());
        assert_eq!(v["title"], "Bad Request");
    }
}
