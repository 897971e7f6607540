//! Error types for the server crate.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tessera_token::{TokenError, VerificationFailure};
use thiserror::Error;

/// Errors that can occur in the token service.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to start the server.
    #[error("failed to start server: {0}")]
    StartupFailed(String),

    /// The request body is not JSON.
    #[error("invalid request body: {0}")]
    BadRequest(String),

    /// Configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Issuing a token failed.
    #[error("{0}")]
    Issuance(#[from] TokenError),

    /// A presented token was refused.
    #[error("{}", VerificationFailure::PUBLIC_MESSAGE)]
    Verification(#[from] VerificationFailure),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Verification(_) => StatusCode::UNAUTHORIZED,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Display for Verification is the uniform public message; the gate
        // that failed is only ever logged.
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_message_hides_gate() {
        let errors = [
            ServerError::from(VerificationFailure::BadSignature),
            ServerError::from(VerificationFailure::Malformed("segment".into())),
        ];
        for err in errors {
            assert_eq!(err.to_string(), "Invalid or expired token");
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_issuance_failure_is_500() {
        let err = ServerError::from(TokenError::MissingClaim {
            claim: "userId".into(),
        });
        assert_eq!(err.to_string(), "claims missing required field: userId");
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bad_request_is_400() {
        let err = ServerError::BadRequest("expected value at line 1 column 1".into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
