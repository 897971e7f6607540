//! Token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim names that only the policy may set.
pub const RESERVED_CLAIMS: &[&str] = &["iss", "aud", "iat", "issuedAt", "exp", "nbf", "jti"];

/// Claims supplied by the application when asking for a token.
///
/// Anything other than `userId` and `role` lands in `extra` and is carried
/// into the token verbatim, except for the reserved names, which are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawClaims {
    /// Opaque user identifier.
    #[serde(rename = "userId")]
    pub user_id: Value,

    /// Opaque role.
    pub role: Value,

    /// Additional application claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawClaims {
    pub fn new(user_id: impl Into<Value>, role: impl Into<Value>) -> Self {
        Self {
            user_id: user_id.into(),
            role: role.into(),
            extra: Map::new(),
        }
    }

    /// Add an application claim.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// The complete claims set signed into a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Value,

    pub role: Value,

    #[serde(rename = "iss")]
    pub issuer: String,

    #[serde(rename = "aud")]
    pub audience: String,

    #[serde(rename = "iat", with = "iso8601")]
    pub issued_at: DateTime<Utc>,

    /// Copy of `iat` under the name older clients read.
    #[serde(
        rename = "issuedAt",
        default,
        with = "iso8601::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub issued_at_alias: Option<DateTime<Utc>>,

    #[serde(rename = "exp", with = "iso8601")]
    pub expires_at: DateTime<Utc>,

    #[serde(
        rename = "nbf",
        default,
        with = "iso8601::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub not_before: Option<DateTime<Utc>>,

    /// Unique token id.
    #[serde(rename = "jti", default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Look up an application claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Time left before expiry, relative to `now`.
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.expires_at - now
    }
}

/// RFC 3339 timestamps in UTC with millisecond precision, e.g.
/// `2025-03-01T12:00:00.000Z`.
pub(crate) mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn format(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw).map(|at| at.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(
            at: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match at {
                Some(at) => serializer.serialize_str(&super::format(at)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::parse(&raw).map_err(D::Error::custom))
                .transpose()
        }
    }
}
