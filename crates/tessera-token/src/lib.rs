//! # tessera-token
//!
//! Self-contained, publicly verifiable tokens for Tessera.
//!
//! This crate provides functionality for:
//! - Generating the process-wide Ed25519 keypair
//! - Injecting issuer, audience and timing claims under a fixed policy
//! - Signing claims into PASETO `v4.public` tokens
//! - Verifying tokens with nothing but the public key
//!
//! ## Verification gates
//!
//! | Gate | Checks | Failure |
//! |------|--------|---------|
//! | Structure | header, base64url, segment count, length | `Malformed` |
//! | Signature | Ed25519 over the pre-authentication encoding | `BadSignature` |
//! | Claims | issuer, audience, expiry, not-before, issued-at | `ClaimsRejected` |
//!
//! Gates are terminal and always run in this order. Callers outside the
//! service only ever see [`VerificationFailure::PUBLIC_MESSAGE`].
//!
//! ## Claims
//!
//! Issued tokens carry `userId`, `role`, `iss`, `aud`, `iat`, `exp`, `nbf`
//! and `jti`. `issuedAt` repeats `iat` for clients of the earlier payload
//! format. Every one of these except `userId` and `role` is set by
//! [`ClaimsPolicy`] and cannot be supplied by the caller.
//!
//! ## Key lifetime
//!
//! Keys live in memory for the life of the process. Restarting the process
//! invalidates every token issued before the restart.

pub mod claims;
pub mod clock;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod policy;
pub mod token;

pub use claims::{Claims, RawClaims};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ClaimViolation, ClaimsRejected, TokenError, VerificationFailure};
pub use keys::{KeyPair, KeyPairProvider, PublicKey};
pub use policy::ClaimsPolicy;
pub use token::{TokenEncoder, TokenInfo, TokenVerifier, VerifiedToken, inspect_token_unverified};
