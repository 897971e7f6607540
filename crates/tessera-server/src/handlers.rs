//! Request handlers for the token service.

use crate::error::ServerError;
use crate::state::AppState;
use axum::{Json, body::Bytes, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tessera_token::{Claims, RawClaims, VerificationFailure};

/// Body of `POST /token`.
///
/// Missing fields arrive as `null` and are rejected by the claims policy, so
/// the caller gets the same error shape as any other issuance failure.
#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    #[serde(rename = "userId", default)]
    pub user_id: Value,
    #[serde(default)]
    pub role: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueResponse {
    pub token: String,
}

/// Body of `POST /verify`.
///
/// `token` is kept as raw JSON so that a number, `null` or a missing field
/// fails the structure gate like any other bad token.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: Value,
}

impl VerifyRequest {
    /// Decode the request body. The content type is not checked and an empty
    /// body counts as `{}`.
    pub fn from_body(body: &[u8]) -> Result<Self, ServerError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| ServerError::BadRequest(e.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub claims: Claims,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub public_key: String,
    pub paserk: String,
}

/// Issue a token for `{userId, role}`.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IssueRequest>,
) -> Result<Json<IssueResponse>, ServerError> {
    let raw = RawClaims::new(req.user_id, req.role);

    let token = state.encoder.sign(raw).map_err(|e| {
        tracing::error!(error = %e, "Token generation failed");
        ServerError::from(e)
    })?;

    Ok(Json(IssueResponse { token }))
}

/// Verify a token and return its claims.
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<VerifyResponse>, ServerError> {
    let req = VerifyRequest::from_body(&body)?;
    let Some(token) = req.token.as_str() else {
        let failure = VerificationFailure::Malformed("token is not a string".into());
        tracing::warn!(gate = failure.gate(), reason = %failure, "Token rejected");
        return Err(failure.into());
    };
    let verified = state.verifier.verify(token)?;

    Ok(Json(VerifyResponse {
        valid: true,
        claims: verified.into_claims(),
    }))
}

/// Publish the verification key so tokens can be checked offline.
pub async fn public_key(State(state): State<Arc<AppState>>) -> Json<PublicKeyResponse> {
    let key = state.public_key();
    Json(PublicKeyResponse {
        public_key: key.to_hex(),
        paserk: key.to_paserk(),
    })
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true, "service": "tessera-server" }))
}
