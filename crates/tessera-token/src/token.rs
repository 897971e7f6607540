//! Token creation and verification.

use crate::claims::{Claims, RawClaims};
use crate::clock::{Clock, SystemClock};
use crate::envelope;
use crate::error::{TokenError, VerificationFailure};
use crate::keys::{KeyPair, KeyPairProvider, PublicKey};
use crate::policy::ClaimsPolicy;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Signs claims into tokens.
#[derive(Clone)]
pub struct TokenEncoder {
    keypair: KeyPair,
    policy: ClaimsPolicy,
    clock: Arc<dyn Clock>,
    footer: Vec<u8>,
    implicit_assertion: Vec<u8>,
}

impl TokenEncoder {
    /// Create a new encoder signing with the provider's keypair.
    pub fn new(provider: &KeyPairProvider, policy: ClaimsPolicy) -> Self {
        Self {
            keypair: provider.keypair().clone(),
            policy,
            clock: Arc::new(SystemClock),
            footer: Vec::new(),
            implicit_assertion: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach a footer (e.g. a key id) to every token. The footer is
    /// authenticated but not encrypted.
    pub fn with_footer(mut self, footer: impl Into<Vec<u8>>) -> Self {
        self.footer = footer.into();
        self
    }

    /// Bind every token to out-of-band bytes the verifier must also know.
    pub fn with_implicit_assertion(mut self, implicit: impl Into<Vec<u8>>) -> Self {
        self.implicit_assertion = implicit.into();
        self
    }

    pub fn policy(&self) -> &ClaimsPolicy {
        &self.policy
    }

    /// Sign claims at the current time.
    pub fn sign(&self, raw: RawClaims) -> Result<String, TokenError> {
        self.sign_at(raw, self.clock.now())
    }

    /// Sign claims as if issued at `now`.
    pub fn sign_at(&self, raw: RawClaims, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = self.policy.inject(raw, now)?;
        let message = serde_json::to_vec(&claims)
            .map_err(|e| TokenError::SerializationError(e.to_string()))?;

        let token = envelope::seal(
            &self.keypair,
            &message,
            &self.footer,
            &self.implicit_assertion,
        );

        tracing::debug!(
            token_id = claims.token_id.as_deref().unwrap_or_default(),
            expires_at = %claims.expires_at,
            "Issued token"
        );

        Ok(token)
    }
}

/// Verifies tokens against a public key and the claims policy.
#[derive(Clone)]
pub struct TokenVerifier {
    public_key: PublicKey,
    policy: ClaimsPolicy,
    clock: Arc<dyn Clock>,
    implicit_assertion: Vec<u8>,
    expected_footer: Option<Vec<u8>>,
}

impl TokenVerifier {
    /// Create a new token verifier with the given public key.
    pub fn new(public_key: PublicKey, policy: ClaimsPolicy) -> Self {
        Self {
            public_key,
            policy,
            clock: Arc::new(SystemClock),
            implicit_assertion: Vec::new(),
            expected_footer: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_implicit_assertion(mut self, implicit: impl Into<Vec<u8>>) -> Self {
        self.implicit_assertion = implicit.into();
        self
    }

    /// Only accept tokens carrying exactly this footer.
    pub fn with_expected_footer(mut self, footer: impl Into<Vec<u8>>) -> Self {
        self.expected_footer = Some(footer.into());
        self
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Verify a token at the current time.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, VerificationFailure> {
        self.verify_at(token, self.clock.now())
    }

    /// Verify a token as of `now`.
    ///
    /// The gates run in a fixed order and each one is terminal: structure,
    /// then signature, then claims. Claims are never looked at before the
    /// signature has been authenticated.
    pub fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, VerificationFailure> {
        let result = self.run_gates(token, now);
        if let Err(failure) = &result {
            match failure {
                VerificationFailure::ClaimsRejected(_) => {
                    tracing::debug!(gate = failure.gate(), reason = %failure, "Token rejected")
                }
                _ => tracing::warn!(gate = failure.gate(), reason = %failure, "Token rejected"),
            }
        }
        result
    }

    fn run_gates(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, VerificationFailure> {
        let envelope =
            envelope::parse(token).map_err(|e| VerificationFailure::Malformed(e.to_string()))?;

        if !envelope.verify(&self.public_key, &self.implicit_assertion) {
            return Err(VerificationFailure::BadSignature);
        }
        if let Some(expected) = &self.expected_footer
            && &envelope.footer != expected
        {
            return Err(VerificationFailure::BadSignature);
        }

        let claims: Claims = serde_json::from_slice(&envelope.message)
            .map_err(|e| VerificationFailure::Malformed(format!("claims: {e}")))?;

        self.policy.validate(&claims, now)?;

        Ok(VerifiedToken {
            claims,
            footer: envelope.footer,
        })
    }
}

/// A token that passed every gate.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub claims: Claims,
    /// Authenticated footer, empty when the token has none.
    pub footer: Vec<u8>,
}

impl VerifiedToken {
    pub fn user_id(&self) -> &serde_json::Value {
        &self.claims.user_id
    }

    pub fn role(&self) -> &serde_json::Value {
        &self.claims.role
    }

    /// The footer as UTF-8, if present and valid.
    pub fn footer_str(&self) -> Option<&str> {
        if self.footer.is_empty() {
            None
        } else {
            std::str::from_utf8(&self.footer).ok()
        }
    }

    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

/// Information about a token (for inspection).
#[derive(Debug)]
pub struct TokenInfo {
    /// Version and purpose tag.
    pub header: &'static str,
    /// Decoded message. Not authenticated.
    pub claims: serde_json::Value,
    /// Footer as text, if any.
    pub footer: Option<String>,
}

/// Inspect a token without verification (for debugging).
pub fn inspect_token_unverified(token: &str) -> Result<TokenInfo, TokenError> {
    let envelope =
        envelope::parse(token.trim()).map_err(|e| TokenError::TokenParseFailed(e.to_string()))?;

    let claims = serde_json::from_slice(&envelope.message)
        .map_err(|e| TokenError::SerializationError(e.to_string()))?;
    let footer = if envelope.footer.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&envelope.footer).into_owned())
    };

    Ok(TokenInfo {
        header: envelope::HEADER,
        claims,
        footer,
    })
}
