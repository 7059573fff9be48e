use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_types::CoreError;
use database::DbError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{error}: {details}")]
    ImportFailed { error: String, details: String },
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl AppError {
    /// Maps a store error from a customer lookup, turning a missing row into a 404.
    pub fn customer(err: DbError) -> Self {
        match err {
            DbError::NotFound => AppError::NotFound("Customer not found".to_string()),
            other => AppError::Database(other),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(DbError::DuplicateIdentification(_) | DbError::HasDependents) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(DbError::NotFound) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::ImportFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(message) | AppError::NotFound(message) => {
                json!({ "error": message })
            }
            AppError::Database(DbError::DuplicateIdentification(_)) => {
                json!({ "error": "The identification number already exists" })
            }
            AppError::Database(DbError::HasDependents) => json!({
                "error": "The customer cannot be deleted because it has associated transactions"
            }),
            AppError::Database(DbError::NotFound) => json!({ "error": "Resource not found" }),
            AppError::Database(db_err) => {
                tracing::error!(error = ?db_err, "Database error.");
                json!({ "error": "An internal database error occurred" })
            }
            AppError::ImportFailed { error, details } => {
                tracing::error!(%details, "Import failed.");
                json!({ "error": error, "details": details })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(
            AppError::from(CoreError::MissingFields(vec!["name".to_string()])).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database(DbError::DuplicateIdentification("1".to_string())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database(DbError::HasDependents).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::customer(DbError::NotFound).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn infrastructure_errors_are_internal() {
        let err = AppError::customer(DbError::ConnectionConfigError("closed".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = AppError::ImportFailed {
            error: "Import failed".to_string(),
            details: "boom".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
