use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::time::Duration;
use thiserror::Error;

use crate::types::{ErrorResponse, Source};

/// Why a single page could not be fetched. Crawlers treat every variant as
/// "no data available now" and stop that source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("fetch gate for {0} timed out after {1:?}")]
    GateTimeout(Source, Duration),
    #[error("no response from {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("all sources failed: {0}")]
    AllSourcesFailed(String),
}

/// Failures surfaced to the HTTP caller.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Too many current requests")]
    Overloaded,
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: message,
                    detail: None,
                },
            ),
            ApiError::Overloaded => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse {
                    error: ApiError::Overloaded.to_string(),
                    detail: None,
                },
            ),
            ApiError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "error".to_string(),
                    detail: Some(detail),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<CrawlError> for ApiError {
    fn from(err: CrawlError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
