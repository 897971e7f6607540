//! Claims policy: the trust-relevant fields injected at issuance and the
//! rules enforced at verification.

use crate::claims::{Claims, RESERVED_CLAIMS, RawClaims};
use crate::error::{ClaimViolation, ClaimsRejected, TokenError};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use uuid::Uuid;

pub const DEFAULT_ISSUER: &str = "my-app";
pub const DEFAULT_AUDIENCE: &str = "users";

/// Default token lifetime, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Issuer, audience and timing rules shared by the encoder and the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsPolicy {
    issuer: String,
    audience: String,
    ttl: Duration,
    leeway: Duration,
    max_token_age: Option<Duration>,
}

impl Default for ClaimsPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ISSUER, DEFAULT_AUDIENCE)
    }
}

impl ClaimsPolicy {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
            leeway: Duration::zero(),
            max_token_age: None,
        }
    }

    /// Lifetime of newly issued tokens.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Clock skew tolerated on every time comparison.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Reject tokens older than `max_age`, regardless of their expiry.
    pub fn with_max_token_age(mut self, max_age: Duration) -> Self {
        self.max_token_age = Some(max_age);
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Build the full claims set for a new token.
    ///
    /// Issuer, audience, timestamps and token id always come from the policy;
    /// caller-supplied values under those names are discarded.
    pub fn inject(&self, raw: RawClaims, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if raw.user_id.is_null() {
            return Err(TokenError::MissingClaim {
                claim: "userId".to_string(),
            });
        }
        if raw.role.is_null() {
            return Err(TokenError::MissingClaim {
                claim: "role".to_string(),
            });
        }

        let mut extra = raw.extra;
        for name in RESERVED_CLAIMS {
            if extra.remove(*name).is_some() {
                tracing::debug!(claim = *name, "Discarded caller-supplied reserved claim");
            }
        }

        // Timestamps travel with millisecond precision.
        let issued_at = now.trunc_subsecs(3);
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::SigningFailed("expiry out of range".to_string()))?;

        Ok(Claims {
            user_id: raw.user_id,
            role: raw.role,
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            issued_at,
            issued_at_alias: Some(issued_at),
            expires_at,
            not_before: Some(issued_at),
            token_id: Some(Uuid::new_v4().to_string()),
            extra,
        })
    }

    /// Check claims against every rule and report all violations.
    ///
    /// Expiry is exclusive: with zero leeway a token is rejected at exactly
    /// its `exp` instant.
    pub fn validate(&self, claims: &Claims, now: DateTime<Utc>) -> Result<(), ClaimsRejected> {
        let mut violations = Vec::new();

        if claims.issuer != self.issuer {
            violations.push(ClaimViolation::IssuerMismatch {
                expected: self.issuer.clone(),
                found: claims.issuer.clone(),
            });
        }

        if claims.audience != self.audience {
            violations.push(ClaimViolation::AudienceMismatch {
                expected: self.audience.clone(),
                found: claims.audience.clone(),
            });
        }

        // Durations come from config unbounded; a bound that overflows the
        // calendar can never be reached.
        let expired = claims
            .expires_at
            .checked_add_signed(self.leeway)
            .is_some_and(|deadline| now >= deadline);
        if expired {
            violations.push(ClaimViolation::Expired {
                expired_at: claims.expires_at,
            });
        }

        let skewed_now = now.checked_add_signed(self.leeway);
        if let Some(not_before) = claims.not_before
            && skewed_now.is_some_and(|t| t < not_before)
        {
            violations.push(ClaimViolation::NotYetValid { not_before });
        }

        if skewed_now.is_some_and(|t| claims.issued_at > t) {
            violations.push(ClaimViolation::IssuedInFuture {
                issued_at: claims.issued_at,
            });
        }

        if let Some(max_age) = self.max_token_age
            && max_age
                .checked_add(&self.leeway)
                .is_some_and(|limit| now.signed_duration_since(claims.issued_at) > limit)
        {
            violations.push(ClaimViolation::TooOld {
                issued_at: claims.issued_at,
            });
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ClaimsRejected { violations })
        }
    }
}
