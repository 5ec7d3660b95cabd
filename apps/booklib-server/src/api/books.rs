use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use booklib_core::Book;
use serde_json::Value;

use crate::{AppState, BookError};

pub(crate) const MERGE_PATCH_JSON: &str = "application/merge-patch+json";

fn book_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, BookError> {
    id.map(|Path(id)| id)
        .map_err(|e| BookError::bad_request(format!("invalid book id: {}", e.body_text())))
}

fn is_merge_patch(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(MERGE_PATCH_JSON))
}

/// Fetch one book.
#[utoipa::path(
    get,
    path = "/api/v1/book/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book", body = crate::openapi::BookDoc),
        (status = 400, description = "Malformed id", body = crate::openapi::ProblemDoc),
        (status = 404, description = "No such book", body = crate::openapi::ProblemDoc)
    )
)]
pub(crate) async fn books_get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Book>, BookError> {
    let id = book_id(id)?;
    Ok(Json(state.books().get(id).await?))
}

/// List books, optionally filtered by up to two `path=value` query parameters.
#[utoipa::path(
    get,
    path = "/api/v1/book",
    tag = "Books",
    description = "Each query parameter names a dot-delimited path into the book \
                   (e.g. `additionalProperties.yearPublished=2019`); all must match.",
    responses(
        (status = 200, description = "Matching books", body = [crate::openapi::BookDoc]),
        (status = 400, description = "Too many or malformed filters", body = crate::openapi::ProblemDoc)
    )
)]
pub(crate) async fn books_list(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<Book>>, BookError> {
    let Query(params) =
        query.map_err(|e| BookError::bad_request(format!("invalid query: {}", e.body_text())))?;
    Ok(Json(state.books().list(params).await?))
}

/// Create a book; ids are assigned by the server.
#[utoipa::path(
    post,
    path = "/api/v1/book",
    tag = "Books",
    request_body = crate::openapi::BookDoc,
    responses(
        (status = 201, description = "Created", body = crate::openapi::BookDoc),
        (status = 400, description = "Invalid book or client-supplied id", body = crate::openapi::ProblemDoc),
        (status = 415, description = "Body is not JSON", body = crate::openapi::ProblemDoc)
    )
)]
pub(crate) async fn books_create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), BookError> {
    let Json(body) = payload.map_err(|e| match e {
        JsonRejection::MissingJsonContentType(inner) => {
            BookError::UnsupportedMediaType(inner.body_text())
        }
        other => BookError::bad_request(other.body_text()),
    })?;
    let created = state.books().create(body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Apply a JSON merge patch to a book.
#[utoipa::path(
    patch,
    path = "/api/v1/book/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    request_body(
        content = serde_json::Value,
        content_type = "application/merge-patch+json",
        description = "Partial book; null removes a field"
    ),
    responses(
        (status = 200, description = "Updated book", body = crate::openapi::BookDoc),
        (status = 400, description = "Patch contains id or is invalid", body = crate::openapi::ProblemDoc),
        (status = 404, description = "No such book", body = crate::openapi::ProblemDoc),
        (status = 415, description = "Wrong content type", body = crate::openapi::ProblemDoc)
    )
)]
pub(crate) async fn books_patch(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Book>, BookError> {
    if !is_merge_patch(&headers) {
        return Err(BookError::UnsupportedMediaType(format!(
            "Expected request with `Content-Type: {MERGE_PATCH_JSON}`"
        )));
    }
    let id = book_id(id)?;
    let patch: Value = serde_json::from_slice(&body)
        .map_err(|_| BookError::bad_request("Invalid patch request body"))?;
    Ok(Json(state.books().patch(id, patch).await?))
}

/// Delete a book.
#[utoipa::path(
    delete,
    path = "/api/v1/book/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book id")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "No such book", body = crate::openapi::ProblemDoc)
    )
)]
pub(crate) async fn books_delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, BookError> {
    let id = book_id(id)?;
    state.books().delete(id).await?;
    Ok(StatusCode::OK)
}
