//! Dashboard configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SUPABASE_URL` - Base URL of the identity provider (GoTrue REST API)
//! - `SUPABASE_ANON_KEY` - Public (anonymous) API key for user-facing auth calls
//!
//! ## Optional
//! - `SUPABASE_SERVICE_ROLE_KEY` - Privileged key; enables user management and
//!   notification fan-out. Without it those features degrade with a message.
//! - `SITE_URL` - Public URL used to build invite links (default: `http://localhost:3000`)
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `QR_SERVICE_URL` - QR image renderer (default: api.qrserver.com)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sample rates (0.0 - 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// Default external QR renderer.
pub const DEFAULT_QR_SERVICE_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";

const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Dashboard application configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public site URL without a trailing slash
    pub site_url: String,
    /// Identity provider configuration
    pub identity: IdentityConfig,
    /// External QR image renderer endpoint
    pub qr_service_url: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Identity provider (GoTrue) configuration.
///
/// Implements `Debug` manually to redact the service role key.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Base URL, e.g. `https://project.supabase.co`
    pub url: String,
    /// Public anonymous key (safe to expose to browsers)
    pub anon_key: String,
    /// Privileged service role key (server only)
    pub service_role_key: Option<SecretString>,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("url", &self.url)
            .field("anon_key", &self.anon_key)
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url = SecretString::from(env.required("DATABASE_URL")?);
        let host = env
            .or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let site_url = parse_base_url("SITE_URL", &env.or_default("SITE_URL", DEFAULT_SITE_URL))?;
        let identity = IdentityConfig::from_env(&env)?;
        let qr_service_url = env.or_default("QR_SERVICE_URL", DEFAULT_QR_SERVICE_URL);
        url::Url::parse(&qr_service_url).map_err(|e| {
            ConfigError::InvalidEnvVar("QR_SERVICE_URL".to_string(), e.to_string())
        })?;

        let sentry_dsn = env.optional("SENTRY_DSN");
        let sentry_environment = env.optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = env
            .optional("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            site_url,
            identity,
            qr_service_url,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.site_url.starts_with("https://")
    }

    /// Where invited users land to finish registration.
    #[must_use]
    pub fn invite_redirect_url(&self) -> String {
        format!("{}/register", self.site_url)
    }
}

impl IdentityConfig {
    fn from_env<F>(env: &Env<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = parse_base_url("SUPABASE_URL", &env.required("SUPABASE_URL")?)?;
        let anon_key = env.required("SUPABASE_ANON_KEY")?;
        let service_role_key = env.optional("SUPABASE_SERVICE_ROLE_KEY").map(|key| {
            if let Err(e) = validate_secret_strength(&key, "SUPABASE_SERVICE_ROLE_KEY") {
                tracing::warn!("SUPABASE_SERVICE_ROLE_KEY validation warning: {e}");
            }
            SecretString::from(key)
        });

        Ok(Self {
            url,
            anon_key,
            service_role_key,
        })
    }

    /// Whether privileged operations are available.
    #[must_use]
    pub const fn has_service_role(&self) -> bool {
        self.service_role_key.is_some()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with blank values treated as unset.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional environment variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Get a required environment variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an environment variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

/// Validate an absolute http(s) URL and strip trailing slashes.
fn parse_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholders and low-entropy values for privileged keys.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InvalidEnvVar(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/assets"),
        ("SUPABASE_URL", "https://project.supabase.co/"),
        ("SUPABASE_ANON_KEY", "anon-public-key"),
    ];

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(config.site_url, "http://localhost:3000");
        assert_eq!(config.identity.url, "https://project.supabase.co");
        assert_eq!(config.qr_service_url, DEFAULT_QR_SERVICE_URL);
        assert!(!config.identity.has_service_role());
        assert!(!config.is_https());
        assert_eq!(config.socket_addr().port(), 3000);
    }

    #[test]
    fn test_site_url_trailing_slash_trimmed() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SITE_URL", "https://assets.example.gov.my/"));
        let config = DashboardConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.site_url, "https://assets.example.gov.my");
        assert_eq!(
            config.invite_redirect_url(),
            "https://assets.example.gov.my/register"
        );
        assert!(config.is_https());
    }

    #[test]
    fn test_missing_required() {
        let err = DashboardConfig::from_lookup(lookup(&BASE[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "DATABASE_URL"));
    }

    #[test]
    fn test_blank_service_key_is_absent() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SUPABASE_SERVICE_ROLE_KEY", "   "));
        let config = DashboardConfig::from_lookup(lookup(&pairs)).unwrap();
        assert!(config.identity.service_role_key.is_none());
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = DashboardConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "PORT"));
    }

    #[test]
    fn test_rejects_non_http_site_url() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SITE_URL", "ftp://assets"));
        assert!(DashboardConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_identity_config_debug_redacts_service_key() {
        let config = IdentityConfig {
            url: "https://project.supabase.co".to_string(),
            anon_key: "anon".to_string(),
            service_role_key: Some(SecretString::from("super-secret-service-key")),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("project.supabase.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-service-key"));
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(validate_secret_strength("your-service-role-key", "K").is_err());
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaaaaaa", "K").is_err());
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "K").is_ok());
    }
}
