//! Keypair management for token signing.

use crate::error::TokenError;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use ed25519_dalek::{KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, SigningKey, VerifyingKey};
use rand::TryRngCore;
use rand::rngs::OsRng;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// PASERK prefix for serialized v4 public keys.
pub const PASERK_PUBLIC_PREFIX: &str = "k4.public.";

/// An Ed25519 keypair for signing tokens.
///
/// The secret half is zeroized when the keypair is dropped.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate a new random keypair from the operating system's entropy source.
    pub fn generate() -> Result<Self, TokenError> {
        let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
        OsRng
            .try_fill_bytes(&mut seed[..])
            .map_err(|e| TokenError::KeyGenerationFailed(e.to_string()))?;

        Ok(Self {
            signing: SigningKey::from_bytes(&seed),
        })
    }

    /// Load a keypair from private key bytes.
    ///
    /// Accepts either the 32-byte seed or the 64-byte `seed || public` form.
    /// In the 64-byte form the public half must match the seed.
    pub fn from_private_key_bytes(bytes: &[u8]) -> Result<Self, TokenError> {
        let signing = match bytes.len() {
            SECRET_KEY_LENGTH => {
                let seed: Zeroizing<[u8; SECRET_KEY_LENGTH]> = Zeroizing::new(
                    bytes
                        .try_into()
                        .map_err(|_| TokenError::InvalidPrivateKey("bad seed length".into()))?,
                );
                SigningKey::from_bytes(&seed)
            }
            KEYPAIR_LENGTH => {
                let pair: Zeroizing<[u8; KEYPAIR_LENGTH]> = Zeroizing::new(
                    bytes
                        .try_into()
                        .map_err(|_| TokenError::InvalidPrivateKey("bad keypair length".into()))?,
                );
                SigningKey::from_keypair_bytes(&pair)
                    .map_err(|e| TokenError::InvalidPrivateKey(e.to_string()))?
            }
            other => {
                return Err(TokenError::InvalidPrivateKey(format!(
                    "expected {SECRET_KEY_LENGTH} or {KEYPAIR_LENGTH} bytes, got {other}"
                )));
            }
        };

        Ok(Self { signing })
    }

    /// Load a keypair from a hex-encoded private key string.
    pub fn from_private_key_hex(hex_str: &str) -> Result<Self, TokenError> {
        let bytes = Zeroizing::new(
            hex::decode(hex_str.trim()).map_err(|e| TokenError::InvalidPrivateKey(e.to_string()))?,
        );
        Self::from_private_key_bytes(&bytes)
    }

    /// Get the signing key.
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key())
    }

    /// Get the public key as hex string.
    pub fn public_key_hex(&self) -> String {
        self.public_key().to_hex()
    }
}

/// Holds the process-wide keypair.
///
/// Constructed once at startup, before any request is accepted, and then
/// shared read-only between the encoder and the verifier.
#[derive(Debug)]
pub struct KeyPairProvider {
    keypair: KeyPair,
}

impl KeyPairProvider {
    /// Generate a fresh keypair. Failure here must abort startup.
    pub fn generate() -> Result<Self, TokenError> {
        let keypair = KeyPair::generate()?;
        tracing::info!(public_key = %keypair.public_key_hex(), "Generated Ed25519 keypair");
        Ok(Self { keypair })
    }

    /// Wrap an existing keypair.
    pub fn from_keypair(keypair: KeyPair) -> Self {
        Self { keypair }
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }
}

/// An Ed25519 public key used to verify tokens.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Load a public key from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TokenError> {
        let raw: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            TokenError::InvalidPublicKey(format!(
                "expected {PUBLIC_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        VerifyingKey::from_bytes(&raw)
            .map(Self)
            .map_err(|e| TokenError::InvalidPublicKey(e.to_string()))
    }

    /// Load a public key from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, TokenError> {
        let bytes =
            hex::decode(hex_str.trim()).map_err(|e| TokenError::InvalidPublicKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Load a public key from its PASERK form (`k4.public.<base64url>`).
    pub fn from_paserk(paserk: &str) -> Result<Self, TokenError> {
        let encoded = paserk
            .trim()
            .strip_prefix(PASERK_PUBLIC_PREFIX)
            .ok_or_else(|| {
                TokenError::InvalidPublicKey(format!("expected prefix {PASERK_PUBLIC_PREFIX}"))
            })?;
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| TokenError::InvalidPublicKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    pub fn to_paserk(&self) -> String {
        format!("{PASERK_PUBLIC_PREFIX}{}", URL_SAFE_NO_PAD.encode(self.0.as_bytes()))
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_hex()).finish()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_paserk())
    }
}

impl FromStr for PublicKey {
    type Err = TokenError;

    /// Accepts either PASERK or hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().starts_with(PASERK_PUBLIC_PREFIX) {
            Self::from_paserk(s)
        } else {
            Self::from_hex(s)
        }
    }
}
