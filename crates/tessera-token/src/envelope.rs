//! PASETO v4.public envelope.
//!
//! A token is `v4.public.` followed by the unpadded base64url encoding of the
//! message and its 64-byte Ed25519 signature, optionally followed by `.` and
//! the base64url-encoded footer:
//!
//! ```text
//! v4.public.<b64(message || signature)>[.<b64(footer)>]
//! ```
//!
//! The signature covers the pre-authentication encoding of the header, the
//! message, the footer and the implicit assertion, so none of them can be
//! swapped without invalidating the token. The implicit assertion is never
//! transmitted; both sides must supply the same bytes.

use crate::keys::{KeyPair, PublicKey};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use ed25519_dalek::{SIGNATURE_LENGTH, Signature, Signer};
use thiserror::Error;

/// Version and purpose tag that prefixes every token.
pub const HEADER: &str = "v4.public.";

/// Pre-authentication encoding.
///
/// `LE64(count)` followed by `LE64(len) || bytes` for every piece, where
/// `LE64` is a little-endian u64 with the most significant bit cleared.
pub fn pre_auth_encode(pieces: &[&[u8]]) -> Vec<u8> {
    let capacity = 8 + pieces.iter().map(|p| 8 + p.len()).sum::<usize>();
    let mut out = Vec::with_capacity(capacity);
    out.extend_from_slice(&le64(pieces.len() as u64));
    for piece in pieces {
        out.extend_from_slice(&le64(piece.len() as u64));
        out.extend_from_slice(piece);
    }
    out
}

fn le64(n: u64) -> [u8; 8] {
    (n & (u64::MAX >> 1)).to_le_bytes()
}

/// Sign `message` and produce the token string.
pub fn seal(keypair: &KeyPair, message: &[u8], footer: &[u8], implicit: &[u8]) -> String {
    let pae = pre_auth_encode(&[HEADER.as_bytes(), message, footer, implicit]);
    let signature = keypair.signing_key().sign(&pae);

    let mut body = Vec::with_capacity(message.len() + SIGNATURE_LENGTH);
    body.extend_from_slice(message);
    body.extend_from_slice(&signature.to_bytes());

    let mut token = format!("{HEADER}{}", URL_SAFE_NO_PAD.encode(&body));
    if !footer.is_empty() {
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(footer));
    }
    token
}

/// A token split into its parts, before the signature has been checked.
#[derive(Debug)]
pub struct UnverifiedEnvelope {
    pub message: Vec<u8>,
    pub footer: Vec<u8>,
    signature: [u8; SIGNATURE_LENGTH],
}

/// Why a token string could not be split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("token does not start with {}", HEADER)]
    WrongHeader,

    #[error("unexpected token segment")]
    TooManySegments,

    #[error("invalid base64url encoding")]
    Base64,

    #[error("token body shorter than a signature")]
    Truncated,
}

/// Split a token into message, signature and footer. Performs no cryptography.
pub fn parse(token: &str) -> Result<UnverifiedEnvelope, EnvelopeError> {
    let rest = token.strip_prefix(HEADER).ok_or(EnvelopeError::WrongHeader)?;

    let mut segments = rest.split('.');
    let body_b64 = segments.next().unwrap_or_default();
    let footer_b64 = segments.next();
    if segments.next().is_some() {
        return Err(EnvelopeError::TooManySegments);
    }

    let body = URL_SAFE_NO_PAD
        .decode(body_b64)
        .map_err(|_| EnvelopeError::Base64)?;
    if body.len() <= SIGNATURE_LENGTH {
        return Err(EnvelopeError::Truncated);
    }

    let footer = match footer_b64 {
        Some(encoded) => {
            let footer = URL_SAFE_NO_PAD
                .decode(encoded)
                .map_err(|_| EnvelopeError::Base64)?;
            // An empty footer is never emitted, so `v4.public.<body>.` is not canonical.
            if footer.is_empty() {
                return Err(EnvelopeError::TooManySegments);
            }
            footer
        }
        None => Vec::new(),
    };

    let split = body.len() - SIGNATURE_LENGTH;
    let mut signature = [0u8; SIGNATURE_LENGTH];
    signature.copy_from_slice(&body[split..]);
    let mut message = body;
    message.truncate(split);

    Ok(UnverifiedEnvelope {
        message,
        footer,
        signature,
    })
}

impl UnverifiedEnvelope {
    /// Check the signature over header, message, footer and implicit assertion.
    ///
    /// Uses strict verification, which rejects small-order keys and
    /// non-canonical signatures.
    pub fn verify(&self, public_key: &PublicKey, implicit: &[u8]) -> bool {
        let pae = pre_auth_encode(&[
            HEADER.as_bytes(),
            self.message.as_slice(),
            self.footer.as_slice(),
            implicit,
        ]);
        let signature = Signature::from_bytes(&self.signature);
        public_key
            .verifying_key()
            .verify_strict(&pae, &signature)
            .is_ok()
    }
}
