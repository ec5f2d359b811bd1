//! Error types and HTTP response conversion

use thiserror::Error;

use crate::repository::RepositoryError;

#[cfg(feature = "http")]
use crate::repository::RepositoryErrorKind;
#[cfg(feature = "http")]
use crate::responses::Envelope;
#[cfg(feature = "http")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Repository or persistence error
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// JWT error (requires `jwt` feature)
    #[cfg(feature = "jwt")]
    #[error("JWT error: {0}")]
    Jwt(Box<jsonwebtoken::errors::Error>),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(feature = "jwt")]
impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Jwt(Box::new(err))
    }
}

#[cfg(feature = "http")]
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Error::Config(e) => {
                tracing::error!("Configuration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR".to_string(),
                    "Service misconfigured".to_string(),
                )
            }

            Error::Repository(ref e) => {
                tracing::error!(
                    operation = %e.operation,
                    kind = %e.kind,
                    entity_type = ?e.entity_type,
                    retriable = e.is_retriable(),
                    "Repository error: {}", e.message
                );

                let status = match e.kind {
                    RepositoryErrorKind::NotFound => StatusCode::NOT_FOUND,
                    RepositoryErrorKind::ConstraintViolation => StatusCode::CONFLICT,
                    RepositoryErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
                    RepositoryErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };

                // Internal details stay in the log
                let message = match e.kind {
                    RepositoryErrorKind::NotFound => "Resource not found".to_string(),
                    RepositoryErrorKind::ConstraintViolation => {
                        "Operation conflicts with existing data".to_string()
                    }
                    RepositoryErrorKind::InvalidArgument => e.message.clone(),
                    RepositoryErrorKind::DeadlineExceeded => {
                        "Database operation timed out".to_string()
                    }
                    _ => "Database operation failed".to_string(),
                };

                (
                    status,
                    format!("REPOSITORY_{}", e.kind.to_string().to_uppercase()),
                    message,
                )
            }

            #[cfg(feature = "jwt")]
            Error::Jwt(e) => {
                tracing::error!("JWT error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TOKEN_ERROR".to_string(),
                    "Token processing failed".to_string(),
                )
            }

            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED".to_string(), msg),

            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST".to_string(), msg),

            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR".to_string(),
                    "Internal server error".to_string(),
                )
            }
        };

        Envelope::<()>::message(status, message)
            .with_code(code)
            .into_response()
    }
}

#[cfg(all(test, feature = "http"))]
mod tests {
    use super::*;
    use crate::repository::RepositoryOperation;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_repository_kinds_map_to_status() {
        let cases = [
            (RepositoryError::not_found("users", "1"), StatusCode::NOT_FOUND),
            (
                RepositoryError::constraint_violation(RepositoryOperation::Create, "dup"),
                StatusCode::CONFLICT,
            ),
            (
                RepositoryError::invalid_argument(RepositoryOperation::Paginate, "bad page"),
                StatusCode::BAD_REQUEST,
            ),
            (
                RepositoryError::connection_failed("refused"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            let response = Error::from(error).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[tokio::test]
    async fn test_unauthorized_envelope() {
        let response = Error::Unauthorized("Unauthorized".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Unauthorized");
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn test_not_found_code() {
        let json = body_json(Error::from(RepositoryError::not_found("users", "9")).into_response()).await;
        assert_eq!(json["code"], "REPOSITORY_NOT_FOUND");
        assert_eq!(json["message"], "Resource not found");
    }
}
