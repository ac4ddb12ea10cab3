use std::env;
use std::fmt;
use std::fs;
use std::time::Duration;

use flurry_auth::TokenConfig;
use serde::{Deserialize, Serialize};
use url::Url;

/// Public service domain; PrivateLink hosts insert `privatelink.` before it.
const SERVICE_DOMAIN: &str = "snowflakecomputing.com";

/// REST API root below the host.
const API_PATH: &str = "/api/v2";

const DEFAULT_TOKEN_TTL_SECONDS: u64 = 60;
/// Upper bound on token lifetime; larger values are clamped.
const MAX_TOKEN_TTL_SECONDS: u64 = 3600;
const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

/// Errors raised while assembling a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingField(&'static str),

    #[error("failed to read key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

// ── Env helpers ─────────────────────────────────────────────────

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.as_str(), "true" | "1"),
        None => default,
    }
}

/// Key material comes either inline (`{KEY}`, with `\n` escapes allowed)
/// or from a file (`{KEY}_PATH`). Inline wins.
fn profiled_key(profile: &str, key: &str) -> Result<String, ConfigError> {
    if let Some(inline) = profiled_env_opt(profile, key) {
        return Ok(inline.replace("\\n", "\n"));
    }
    match profiled_env_opt(profile, &format!("{key}_PATH")) {
        Some(path) => {
            fs::read_to_string(&path).map_err(|source| ConfigError::KeyFile { path, source })
        }
        None => Ok(String::new()),
    }
}

// ── ClientConfig ─────────────────────────────────────────────────

/// Everything the coordinator needs: identity, key material, endpoint and
/// timing knobs.
///
/// Reads from environment variables with optional profile prefix.
/// When `FLURRY_PROFILE=PROD`, checks `PROD_SNOWFLAKE_ACCOUNT` before
/// `SNOWFLAKE_ACCOUNT`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Account identifier (`myorg-myaccount`, `xy12345.us-east-1`, ...).
    pub account: String,
    /// Login name of the key-pair user.
    pub user: String,
    /// PKCS#8 private key PEM.
    #[serde(default, skip_serializing)]
    pub private_key_pem: String,
    /// Public key PEM, used for the fingerprint.
    #[serde(default, skip_serializing)]
    pub public_key_pem: String,
    /// Lifetime of each issued JWT.
    pub token_ttl_seconds: u64,
    /// Explicit host (or full `scheme://host[:port]`) overriding the
    /// account-derived one.
    pub host: Option<String>,
    /// Route through `{account}.privatelink.snowflakecomputing.com`.
    pub private_link: bool,
    /// Per-request HTTP timeout.
    pub http_timeout_seconds: u64,
    /// Sleep between probes while waiting on a running statement.
    pub poll_interval_ms: u64,
    /// Probe budget for waiting on a running statement.
    pub max_poll_attempts: u32,
}

impl ClientConfig {
    /// Config with defaults for everything except identity and keys.
    pub fn new(
        account: impl Into<String>,
        user: impl Into<String>,
        private_key_pem: impl Into<String>,
        public_key_pem: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            user: user.into(),
            private_key_pem: private_key_pem.into(),
            public_key_pem: public_key_pem.into(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            host: None,
            private_link: false,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }

    /// Build config from environment variables.
    ///
    /// Reads `FLURRY_PROFILE` to determine the profile prefix.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env_opt("FLURRY_PROFILE")
            .map(|s| s.to_uppercase())
            .unwrap_or_default();
        Self::from_env_profiled(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn from_env_profiled(profile: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            account: profiled_env_or(profile, "SNOWFLAKE_ACCOUNT", ""),
            user: profiled_env_or(profile, "SNOWFLAKE_USER", ""),
            private_key_pem: profiled_key(profile, "SNOWFLAKE_PRIVATE_KEY")?,
            public_key_pem: profiled_key(profile, "SNOWFLAKE_PUBLIC_KEY")?,
            token_ttl_seconds: profiled_env_u64(
                profile,
                "SNOWFLAKE_TOKEN_TTL_SECONDS",
                DEFAULT_TOKEN_TTL_SECONDS,
            ),
            host: profiled_env_opt(profile, "SNOWFLAKE_HOST"),
            private_link: profiled_env_bool(profile, "SNOWFLAKE_PRIVATELINK", false),
            http_timeout_seconds: profiled_env_u64(
                profile,
                "SNOWFLAKE_HTTP_TIMEOUT_SECONDS",
                DEFAULT_HTTP_TIMEOUT_SECONDS,
            ),
            poll_interval_ms: profiled_env_u64(
                profile,
                "SNOWFLAKE_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            ),
            max_poll_attempts: profiled_env_u32(
                profile,
                "SNOWFLAKE_MAX_POLL_ATTEMPTS",
                DEFAULT_MAX_POLL_ATTEMPTS,
            ),
        })
    }

    /// Check that identity and key material are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account.trim().is_empty() {
            return Err(ConfigError::MissingField("account"));
        }
        if self.user.trim().is_empty() {
            return Err(ConfigError::MissingField("user"));
        }
        if self.private_key_pem.trim().is_empty() {
            return Err(ConfigError::MissingField("private_key"));
        }
        if self.public_key_pem.trim().is_empty() {
            return Err(ConfigError::MissingField("public_key"));
        }
        Ok(())
    }

    /// Host the API lives on: explicit override, then PrivateLink, then the
    /// public account host.
    pub fn resolved_host(&self) -> String {
        if let Some(host) = self.host.as_deref().filter(|h| !h.is_empty()) {
            return host.trim_end_matches('/').to_string();
        }
        let account = self.account.to_lowercase();
        if self.private_link {
            format!("{account}.privatelink.{SERVICE_DOMAIN}")
        } else {
            format!("{account}.{SERVICE_DOMAIN}")
        }
    }

    /// `https://{host}/api/v2`, or the override's own scheme when it has one.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let host = self.resolved_host();
        let raw = if host.contains("://") {
            format!("{host}{API_PATH}")
        } else {
            format!("https://{host}{API_PATH}")
        };

        let url = Url::parse(&raw).map_err(|_| ConfigError::Invalid {
            key: "host",
            value: host.clone(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::Invalid { key: "host", value: host });
        }
        Ok(url)
    }

    /// Identity and keys in the shape the token issuer wants.
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            account: self.account.clone(),
            user: self.user.clone(),
            private_key_pem: self.private_key_pem.clone(),
            public_key_pem: self.public_key_pem.clone(),
            valid_for: chrono::Duration::seconds(
                self.token_ttl_seconds.min(MAX_TOKEN_TTL_SECONDS) as i64,
            ),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("private_key_pem", &"<redacted>")
            .field("public_key_pem", &"<redacted>")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("host", &self.host)
            .field("private_link", &self.private_link)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────
