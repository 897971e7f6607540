//! `tessera serve` - Start the HTTP token service.

use std::path::PathBuf;
use tessera_server::{AppConfig, TokenServer, load_config};

/// Resolve the effective configuration. `--bind` wins over the file and `PORT`.
pub fn resolve_config(config: Option<PathBuf>, bind: Option<String>) -> anyhow::Result<AppConfig> {
    let mut cfg = load_config(config.as_deref())?;
    if let Some(bind) = bind {
        cfg.server.bind = bind;
    }
    Ok(cfg)
}

pub async fn run(config: Option<PathBuf>, bind: Option<String>) -> anyhow::Result<()> {
    let cfg = resolve_config(config, bind)?;
    tracing::info!(
        bind = %cfg.server.bind,
        issuer = %cfg.token.issuer,
        audience = %cfg.token.audience,
        ttl = %cfg.token.ttl,
        "Starting tessera-server"
    );

    TokenServer::new(cfg).run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_bind_flag_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tessera.toml");
        fs::write(&path, "[server]\nbind = \"127.0.0.1:9000\"\n").unwrap();

        let cfg = resolve_config(Some(path.clone()), None).unwrap();
        assert!(cfg.server.bind.starts_with("127.0.0.1:"));

        let cfg = resolve_config(Some(path), Some("127.0.0.1:7000".into())).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:7000");
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempdir().unwrap();
        assert!(resolve_config(Some(dir.path().join("nope.toml")), None).is_err());
    }
}
