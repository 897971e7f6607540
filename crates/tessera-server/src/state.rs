use crate::config::AppConfig;
use crate::error::ServerError;
use tessera_token::{KeyPairProvider, PublicKey, TokenEncoder, TokenVerifier};

/// Shared application state.
///
/// Everything in here is immutable after startup, so handlers share it
/// through an `Arc` without locking.
pub struct AppState {
    pub cfg: AppConfig,
    pub encoder: TokenEncoder,
    pub verifier: TokenVerifier,
}

impl AppState {
    pub fn init(cfg: &AppConfig, provider: &KeyPairProvider) -> Result<Self, ServerError> {
        let policy = cfg.token.policy()?;

        let mut encoder = TokenEncoder::new(provider, policy.clone());
        let mut verifier = TokenVerifier::new(provider.public_key(), policy);

        if let Some(footer) = &cfg.token.footer {
            encoder = encoder.with_footer(footer.as_bytes());
            verifier = verifier.with_expected_footer(footer.as_bytes());
        }

        Ok(Self {
            cfg: cfg.clone(),
            encoder,
            verifier,
        })
    }

    pub fn public_key(&self) -> PublicKey {
        self.verifier.public_key()
    }
}
