use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::responses;

pub(crate) const NOT_FOUND_DETAIL: &str = "No book found for provided Id";

#[derive(Debug, Error)]
pub(crate) enum BookError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    UnsupportedMediaType(String),
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl BookError {
    pub fn not_found() -> Self {
        Self::NotFound(NOT_FOUND_DETAIL.to_string())
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest(detail.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BookError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Storage(err) => {
                tracing::error!(error = %format!("{err:#}"), "book store request failed");
                responses::problem(status, Some("storage failure"))
            }
            other => responses::problem(status, Some(&other.to_string())),
        }
    }
}
