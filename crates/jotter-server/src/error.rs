use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use jotter_store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Note not found")]
    NoteNotFound,

    #[error("Duplicate note title")]
    DuplicateTitle,

    #[error("Database error: {0}")]
    Database(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            // A unique-index violation is a client conflict, not a fault.
            StoreError::DuplicateTitle => ApiError::DuplicateTitle,
            other => ApiError::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NoteNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::DuplicateTitle => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Database(err) => {
                tracing::error!(error = %err, "store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (ApiError::BadRequest("All fields are required".into()), StatusCode::BAD_REQUEST),
            (ApiError::NoteNotFound, StatusCode::NOT_FOUND),
            (ApiError::DuplicateTitle, StatusCode::CONFLICT),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn store_duplicate_maps_to_conflict() {
        let err: ApiError = StoreError::DuplicateTitle.into();
        assert!(matches!(err, ApiError::DuplicateTitle));
    }

    #[test]
    fn store_faults_map_to_internal_error() {
        let err: ApiError = StoreError::MissingInsertId.into();
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
