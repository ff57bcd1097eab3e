use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use todo_core::{ErrorBody, StoreError, ValidationErrors};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

// A non-numeric id can never name a record.
impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound("todo not found".to_string())
    }
}

fn validation_response(errors: &ValidationErrors) -> Response {
    let body = ErrorBody {
        message: errors.to_string(),
        errors: Some(errors.by_field()),
    };
    (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, message) = match &self {
            ApiError::Validation(errors) | ApiError::Store(StoreError::Validation(errors)) => {
                return validation_response(errors);
            }
            ApiError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            ApiError::Rejected { status, message } => (*status, message.clone()),
            ApiError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status_code.is_server_error() {
            tracing::error!(status = %status_code, error = %self, "API request failed");
        } else {
            tracing::debug!(status = %status_code, error = %self, "API request rejected");
        }

        (status_code, Json(ErrorBody::new(message))).into_response()
    }
}
