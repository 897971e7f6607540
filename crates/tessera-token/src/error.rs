//! Error types for the token crate.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while managing keys or issuing tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Failed to generate keypair.
    #[error("failed to generate keypair: {0}")]
    KeyGenerationFailed(String),

    /// Failed to parse private key.
    #[error("failed to parse private key: {0}")]
    InvalidPrivateKey(String),

    /// Failed to parse public key.
    #[error("failed to parse public key: {0}")]
    InvalidPublicKey(String),

    /// Failed to sign token.
    #[error("failed to sign token: {0}")]
    SigningFailed(String),

    /// Claims are missing a required field.
    #[error("claims missing required field: {claim}")]
    MissingClaim { claim: String },

    /// Failed to serialize/deserialize claims.
    #[error("claims serialization error: {0}")]
    SerializationError(String),

    /// Failed to parse token.
    #[error("failed to parse token: {0}")]
    TokenParseFailed(String),
}

/// Why a token was refused.
///
/// The variant identifies the gate that rejected the token. It is meant for
/// logs; callers outside the service should only ever be shown
/// [`VerificationFailure::PUBLIC_MESSAGE`].
#[derive(Debug, Error)]
pub enum VerificationFailure {
    /// The token could not be parsed into header, message and signature, or
    /// the signed message is not a claims object.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The signature does not authenticate the token under the public key.
    #[error("signature verification failed")]
    BadSignature,

    /// The signature is valid but the claims violate the policy.
    #[error("claims rejected: {0}")]
    ClaimsRejected(#[from] ClaimsRejected),
}

impl VerificationFailure {
    /// The only failure text that may leave the service.
    pub const PUBLIC_MESSAGE: &'static str = "Invalid or expired token";

    /// Name of the gate that produced this failure.
    pub fn gate(&self) -> &'static str {
        match self {
            VerificationFailure::Malformed(_) => "structure",
            VerificationFailure::BadSignature => "signature",
            VerificationFailure::ClaimsRejected(_) => "claims",
        }
    }

    /// Message safe to return to an untrusted caller.
    pub fn public_message(&self) -> &'static str {
        Self::PUBLIC_MESSAGE
    }
}

/// Every policy rule a set of claims failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsRejected {
    pub violations: Vec<ClaimViolation>,
}

impl ClaimsRejected {
    /// Whether a specific rule is among the violations.
    pub fn contains(&self, predicate: impl Fn(&ClaimViolation) -> bool) -> bool {
        self.violations.iter().any(predicate)
    }
}

impl fmt::Display for ClaimsRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ClaimsRejected {}

/// A single failed policy rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimViolation {
    #[error("issuer mismatch: expected {expected}, found {found}")]
    IssuerMismatch { expected: String, found: String },

    #[error("audience mismatch: expected {expected}, found {found}")]
    AudienceMismatch { expected: String, found: String },

    #[error("token expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    #[error("token not valid before {not_before}")]
    NotYetValid { not_before: DateTime<Utc> },

    #[error("token issued in the future at {issued_at}")]
    IssuedInFuture { issued_at: DateTime<Utc> },

    #[error("token issued at {issued_at} exceeds the maximum age")]
    TooOld { issued_at: DateTime<Utc> },
}
