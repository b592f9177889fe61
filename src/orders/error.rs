use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error, warn};

use crate::error::ErrorResponse;
use crate::orders::ItemFieldError;

/// Error types for order operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(Vec<ItemFieldError>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl OrderError {
    /// Single order-level validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        OrderError::Validation(vec![ItemFieldError::for_order(field, message)])
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OrderError::NotFound(_) => StatusCode::NOT_FOUND,
            OrderError::Forbidden(_) => StatusCode::FORBIDDEN,
            OrderError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            OrderError::Validation(_) => StatusCode::BAD_REQUEST,
            OrderError::BadRequest(_) => StatusCode::BAD_REQUEST,
            OrderError::Conflict(_) => StatusCode::CONFLICT,
            OrderError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::DatabaseError(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for OrderError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        OrderError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}

impl From<validator::ValidationErrors> for OrderError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    ItemFieldError::for_order(field, message)
                })
            })
            .collect();
        OrderError::Validation(fields)
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            OrderError::DatabaseError(msg) => {
                error!("Order database error: {}", msg);
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred")
            }
            OrderError::NotFound(what) => {
                debug!("{} not found", what);
                ErrorResponse::new("NOT_FOUND", format!("{} not found", what))
            }
            OrderError::Forbidden(msg) => {
                warn!("Forbidden order operation: {}", msg);
                ErrorResponse::new("FORBIDDEN", msg)
            }
            OrderError::InvalidTransition(msg) => {
                debug!("Invalid transition: {}", msg);
                ErrorResponse::new("INVALID_TRANSITION", msg)
            }
            OrderError::Validation(fields) => {
                debug!("Order validation failed: {:?}", fields);
                ErrorResponse::new("VALIDATION_ERROR", "Request validation failed")
                    .with_details(serde_json::to_value(&fields).unwrap_or_default())
            }
            OrderError::BadRequest(msg) => {
                debug!("Bad order request: {}", msg);
                ErrorResponse::new("BAD_REQUEST", msg)
            }
            OrderError::Conflict(msg) => {
                warn!("Order update conflict: {}", msg);
                ErrorResponse::new("CONFLICT", msg)
            }
            OrderError::Configuration(msg) => {
                error!("Pricing unavailable: {}", msg);
                ErrorResponse::new("CONFIGURATION_ERROR", msg)
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            OrderError::InvalidTransition("rejected to approved".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            OrderError::Conflict("status changed".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            OrderError::Configuration("no price table".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            OrderError::NotFound("Order".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_invalid_builds_order_level_field_error() {
        match OrderError::invalid("items", "Order must contain at least one item") {
            OrderError::Validation(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "items");
                assert!(fields[0].item_index.is_none());
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_database_error_message_is_generic() {
        let response = OrderError::from(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
