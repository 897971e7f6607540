use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};
use tessera_token::ClaimsPolicy;
use tessera_token::policy::{DEFAULT_AUDIENCE, DEFAULT_ISSUER};

use crate::error::ServerError;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TESSERA_CONFIG";

/// Config file used when neither `--config` nor `TESSERA_CONFIG` is set.
pub const DEFAULT_CONFIG_FILE: &str = "tessera.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub token: TokenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:3000"
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_issuer")]
    pub issuer: String,

    #[serde(default = "default_audience")]
    pub audience: String,

    /// Token lifetime, e.g. "1h", "15m".
    #[serde(default = "default_ttl")]
    pub ttl: String,

    /// Tolerated clock skew on verification.
    #[serde(default = "default_leeway")]
    pub leeway: String,

    /// Reject tokens issued longer ago than this, even if unexpired.
    #[serde(default)]
    pub max_token_age: Option<String>,

    /// Footer attached to every issued token and required on verification.
    #[serde(default)]
    pub footer: Option<String>,
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

fn default_audience() -> String {
    DEFAULT_AUDIENCE.to_string()
}

fn default_ttl() -> String {
    "1h".to_string()
}

fn default_leeway() -> String {
    "0s".to_string()
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            audience: default_audience(),
            ttl: default_ttl(),
            leeway: default_leeway(),
            max_token_age: None,
            footer: None,
        }
    }
}

impl TokenConfig {
    /// Build the claims policy described by this section.
    pub fn policy(&self) -> Result<ClaimsPolicy, ServerError> {
        if self.issuer.trim().is_empty() {
            return Err(ServerError::InvalidConfig("token.issuer must not be empty".into()));
        }
        if self.audience.trim().is_empty() {
            return Err(ServerError::InvalidConfig("token.audience must not be empty".into()));
        }

        let ttl = parse_duration("token.ttl", &self.ttl)?;
        if ttl <= Duration::zero() {
            return Err(ServerError::InvalidConfig("token.ttl must be positive".into()));
        }

        let mut policy = ClaimsPolicy::new(&self.issuer, &self.audience)
            .with_ttl(ttl)
            .with_leeway(parse_duration("token.leeway", &self.leeway)?);

        if let Some(max_age) = &self.max_token_age {
            policy = policy.with_max_token_age(parse_duration("token.max_token_age", max_age)?);
        }

        Ok(policy)
    }
}

fn parse_duration(field: &str, raw: &str) -> Result<Duration, ServerError> {
    let std_duration = humantime::parse_duration(raw.trim())
        .map_err(|e| ServerError::InvalidConfig(format!("{field}: {e}")))?;
    Duration::from_std(std_duration)
        .map_err(|e| ServerError::InvalidConfig(format!("{field}: {e}")))
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(raw)?;
        cfg.token.policy()?;
        Ok(cfg)
    }

    /// Replace the port of the bind address, keeping its host.
    pub fn with_port(mut self, port: &str) -> anyhow::Result<Self> {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid PORT {port:?}: {e}"))?;
        let host = self
            .server
            .bind
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("0.0.0.0");
        self.server.bind = format!("{host}:{port}");
        Ok(self)
    }
}

/// Load the config file, falling back to built-in defaults when the default
/// file does not exist. `PORT` overrides the bind port.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let (path, required) = config_path(explicit);

    let cfg = if path.exists() {
        let raw = fs::read_to_string(&path)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        AppConfig::from_toml_str(&raw)?
    } else if required {
        anyhow::bail!("config file not found: {}", path.display());
    } else {
        AppConfig::default()
    };

    match env::var("PORT") {
        Ok(port) => cfg.with_port(&port),
        Err(_) => Ok(cfg),
    }
}

fn config_path(explicit: Option<&Path>) -> (PathBuf, bool) {
    if let Some(p) = explicit {
        return (p.to_path_buf(), true);
    }
    if let Ok(p) = env::var(CONFIG_ENV) {
        return (PathBuf::from(p), true);
    }
    (PathBuf::from(DEFAULT_CONFIG_FILE), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.bind, "0.0.0.0:3000");

        let policy = cfg.token.policy().unwrap();
        assert_eq!(policy.issuer(), "my-app");
        assert_eq!(policy.audience(), "users");
        assert_eq!(policy.ttl(), Duration::hours(1));
    }

    #[test]
    fn test_parse_toml() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [server]
            bind = "127.0.0.1:8081"

            [token]
            issuer = "billing"
            ttl = "15m"
            leeway = "5s"
            footer = "kid:2025-06"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.bind, "127.0.0.1:8081");
        assert_eq!(cfg.token.audience, "users");
        assert_eq!(cfg.token.footer.as_deref(), Some("kid:2025-06"));

        let policy = cfg.token.policy().unwrap();
        assert_eq!(policy.issuer(), "billing");
        assert_eq!(policy.ttl(), Duration::minutes(15));
    }

    #[test]
    fn test_rejects_invalid_token_section() {
        assert!(AppConfig::from_toml_str("[token]\nttl = \"soon\"").is_err());
        assert!(AppConfig::from_toml_str("[token]\nttl = \"0s\"").is_err());
        assert!(AppConfig::from_toml_str("[token]\nissuer = \"\"").is_err());
        assert!(AppConfig::from_toml_str("[token]\naudience = \"  \"").is_err());
    }

    #[test]
    fn test_port_override_keeps_host() {
        let cfg = AppConfig::default().with_port("8443").unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:8443");

        assert!(AppConfig::default().with_port("http").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[token]\naudience = \"partners\"").unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.token.audience, "partners");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
