//! Token commands.
//!
//! `tessera token inspect` - Dump a token's contents without verifying it.
//! `tessera token verify` - Verify a token with only the public key.

use anyhow::Context;
use std::fs;
use std::path::Path;
use tessera_token::policy::{DEFAULT_AUDIENCE, DEFAULT_ISSUER};
use tessera_token::{ClaimsPolicy, PublicKey, TokenVerifier, VerifiedToken, inspect_token_unverified};

/// Resolve a public key from a file path, hex string or PASERK string.
fn resolve_public_key(key: Option<String>) -> anyhow::Result<PublicKey> {
    let key_str = key.context(
        "Public key not provided. Either pass --public-key or set TESSERA_PUBLIC_KEY env var",
    )?;

    let path = Path::new(&key_str);
    let raw = if path.exists() {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read public key file: {}", path.display()))?
    } else {
        key_str
    };

    raw.trim()
        .parse::<PublicKey>()
        .context("Failed to parse public key. Expected hex or k4.public PASERK")
}

/// Load a token from a file if the argument names one.
fn resolve_token(token: String) -> anyhow::Result<String> {
    if Path::new(&token).exists() {
        Ok(fs::read_to_string(&token)?.trim().to_string())
    } else {
        Ok(token.trim().to_string())
    }
}

/// Inspect a token without verification.
pub fn inspect(token: String) -> anyhow::Result<()> {
    let token_str = resolve_token(token)?;
    let info = inspect_token_unverified(&token_str)?;

    println!("Token Information (NOT verified):");
    println!("  Header: {}", info.header);
    if let Some(footer) = &info.footer {
        println!("  Footer: {}", footer);
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&info.claims)?);

    Ok(())
}

/// Check a token offline against the given public key and scope.
pub fn check(
    public_key: Option<String>,
    issuer: Option<String>,
    audience: Option<String>,
    token: String,
) -> anyhow::Result<VerifiedToken> {
    let public_key = resolve_public_key(public_key)?;
    let policy = ClaimsPolicy::new(
        issuer.as_deref().unwrap_or(DEFAULT_ISSUER),
        audience.as_deref().unwrap_or(DEFAULT_AUDIENCE),
    );
    let verifier = TokenVerifier::new(public_key, policy);

    let token_str = resolve_token(token)?;
    verifier
        .verify(&token_str)
        .map_err(|e| anyhow::anyhow!("Token verification failed ({} check): {}", e.gate(), e))
}

/// Verify a token is valid and print its claims.
pub fn verify(
    public_key: Option<String>,
    issuer: Option<String>,
    audience: Option<String>,
    token: String,
) -> anyhow::Result<()> {
    let verified = match check(public_key, issuer, audience, token) {
        Ok(v) => v,
        Err(e) => {
            println!("✖ {}", e);
            return Err(e);
        }
    };

    println!("✔ Token is valid");
    println!();
    println!("Token Details:");
    println!("  User: {}", verified.user_id());
    println!("  Role: {}", verified.role());
    println!("  Issuer: {}", verified.claims.issuer);
    println!("  Audience: {}", verified.claims.audience);
    println!("  Expires: {}", verified.claims.expires_at.to_rfc3339());
    if let Some(jti) = &verified.claims.token_id {
        println!("  Token ID: {}", jti);
    }
    if let Some(footer) = verified.footer_str() {
        println!("  Footer: {}", footer);
    }

    Ok(())
}
