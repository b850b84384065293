//! HTTP mapping of catalog failures.

use crate::catalog_store::{CatalogError, CatalogResult, ConsistencyEngine, ValidationError};
use anyhow::anyhow;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorResponse {
            message: message.into(),
        }
    }
}

pub fn error_status(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
        CatalogError::Conflict(_) => StatusCode::CONFLICT,
        CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
        CatalogError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        CatalogError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Message safe to hand to a client. Store failures stay in the logs.
pub fn error_message(err: &CatalogError) -> String {
    match err {
        CatalogError::NotFound { kind, .. } => format!("{} not found", kind),
        CatalogError::Conflict(reason) => reason.clone(),
        CatalogError::Validation(reason) => reason.to_string(),
        CatalogError::Timeout(_) => "Catalog is busy, try again later".to_string(),
        CatalogError::Store(_) => "Internal server error".to_string(),
    }
}

pub fn log_error(err: &CatalogError) {
    match err {
        CatalogError::Store(cause) => error!("Catalog store failure: {:#}", cause),
        CatalogError::Timeout(after) => warn!("Catalog operation timed out after {:?}", after),
        other => debug!("Request rejected: {}", other),
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        log_error(&self);
        (error_status(&self), Json(ErrorResponse::new(error_message(&self)))).into_response()
    }
}

/// Turns a body extraction failure into a 400 instead of axum's default 422.
pub fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> CatalogResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ValidationError::Malformed(rejection.body_text()).into())
}

/// Runs a catalog operation on the blocking pool. Store calls may sleep while
/// waiting for the write lock.
pub async fn run_blocking<T, F>(engine: Arc<ConsistencyEngine>, op: F) -> CatalogResult<T>
where
    T: Send + 'static,
    F: FnOnce(&ConsistencyEngine) -> CatalogResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&engine))
        .await
        .map_err(|err| CatalogError::Store(anyhow!("Catalog task failed: {}", err)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::EntityKind;
    use std::time::Duration;

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (
                CatalogError::not_found(EntityKind::Track, "t1"),
                StatusCode::NOT_FOUND,
            ),
            (
                CatalogError::Conflict("dup".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                ValidationError::EmptyBatch.into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                CatalogError::Timeout(Duration::from_millis(5)),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CatalogError::Store(anyhow!("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(error_status(&err), status);
        }
    }

    #[test]
    fn store_details_are_not_exposed() {
        let err = CatalogError::Store(anyhow!("/var/db/catalog.db is corrupt"));
        assert_eq!(error_message(&err), "Internal server error");

        let err = CatalogError::not_found(EntityKind::Track, "t1");
        assert_eq!(error_message(&err), "Track not found");
    }
}
