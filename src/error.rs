use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::{Display, Error};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::store::StoreError;

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Enables internal error details in 500 responses. Only set in development.
pub fn expose_internal_details(enabled: bool) {
    EXPOSE_DETAILS.store(enabled, Ordering::Relaxed);
}

/// One failing input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "month")]
    pub field: String,
    #[schema(example = "must be between 1 and 12")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "Validation error")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object, nullable = true)]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display(fmt = "Validation error")]
    Validation(#[error(not(source))] Vec<FieldError>),

    #[display(fmt = "{}", _0)]
    BadRequest(#[error(not(source))] String),

    #[display(fmt = "{}", _0)]
    NotFound(#[error(not(source))] String),

    #[display(fmt = "{}", _0)]
    Conflict(#[error(not(source))] String),

    #[display(fmt = "Unauthorized")]
    Unauthorized,

    #[display(fmt = "{}", _0)]
    Forbidden(#[error(not(source))] String),

    #[display(fmt = "Internal Server Error")]
    Store(#[error(source)] StoreError),

    #[display(fmt = "Assistant service failed")]
    Upstream(#[error(not(source))] String),

    #[display(fmt = "{}", _0)]
    Unavailable(#[error(not(source))] String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn body(&self) -> ErrorBody {
        let details = match self {
            AppError::Validation(fields) => Some(json!(fields)),
            AppError::Store(e) if EXPOSE_DETAILS.load(Ordering::Relaxed) => {
                Some(json!(e.to_string()))
            }
            AppError::Upstream(msg) if EXPOSE_DETAILS.load(Ordering::Relaxed) => {
                Some(json!(msg))
            }
            _ => None,
        };

        ErrorBody {
            error: self.to_string(),
            details,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Store(e) => tracing::error!(error = %e, "Datastore failure"),
            AppError::Upstream(e) => tracing::error!(error = %e, "Assistant upstream failure"),
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(self.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_field() {
        let err = AppError::Validation(vec![
            FieldError::new("month", "must be between 1 and 12"),
            FieldError::new("year", "must be between 2000 and 2100"),
        ]);
        let body = serde_json::to_value(err.body()).unwrap();

        assert_eq!(body["error"], "Validation error");
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
        assert_eq!(body["details"][1]["field"], "year");
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::Validation(vec![]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::conflict("dup").status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::not_found("gone").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Store(StoreError::Timeout).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_hide_details_by_default() {
        let err = AppError::Store(StoreError::Backend("connection refused".into()));
        let body = serde_json::to_value(err.body()).unwrap();

        assert_eq!(body["error"], "Internal Server Error");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn conflict_message_is_surfaced() {
        let err = AppError::conflict("A salary record already exists for this employee and period");
        assert_eq!(
            err.to_string(),
            "A salary record already exists for this employee and period"
        );
    }
}
