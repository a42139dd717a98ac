//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SOLARSHOP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `SOLARSHOP_BASE_URL` - Public URL of the storefront (used in email links)
//! - `SOLARSHOP_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `SOLARSHOP_HOST` - Bind address (default: 127.0.0.1)
//! - `SOLARSHOP_PORT` - Listen port (default: 8080)
//! - `SOLARSHOP_UPLOAD_DIR` - Directory for product images (default: uploads)
//! - `SOLARSHOP_MAX_UPLOAD_BYTES` - Image size limit (default: 5 MiB)
//! - `SOLARSHOP_RATE_LIMIT` - Per-IP rate limiting on `/api` (default: true)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` -
//!   outgoing mail; without `SMTP_HOST` emails are written to the log
//! - `MPESA_ENVIRONMENT` (sandbox|production), `MPESA_CONSUMER_KEY`,
//!   `MPESA_CONSUMER_SECRET`, `MPESA_SHORTCODE`, `MPESA_PASSKEY`,
//!   `MPESA_CALLBACK_URL` - Daraja STK push; without `MPESA_CONSUMER_KEY`
//!   payment endpoints answer 503
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE` - error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Where uploaded product images are stored
    pub upload_dir: PathBuf,
    /// Maximum accepted image size in bytes
    pub max_upload_bytes: usize,
    /// Per-IP rate limiting on `/api` routes
    pub rate_limit: bool,
    /// SMTP settings; `None` logs emails instead of sending them
    pub email: Option<EmailConfig>,
    /// M-Pesa Daraja settings; `None` disables payments
    pub mpesa: Option<MpesaConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Safaricom Daraja environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpesaEnvironment {
    Sandbox,
    Production,
}

impl MpesaEnvironment {
    /// API base URL for this environment.
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.safaricom.co.ke",
            Self::Production => "https://api.safaricom.co.ke",
        }
    }
}

impl std::str::FromStr for MpesaEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" | "live" => Ok(Self::Production),
            other => Err(format!("expected sandbox or production, got {other}")),
        }
    }
}

/// M-Pesa STK push configuration.
///
/// Implements `Debug` manually to redact the consumer secret and passkey.
#[derive(Clone)]
pub struct MpesaConfig {
    pub environment: MpesaEnvironment,
    /// Daraja app consumer key
    pub consumer_key: String,
    /// Daraja app consumer secret
    pub consumer_secret: SecretString,
    /// Paybill / till number (`BusinessShortCode`)
    pub shortcode: String,
    /// Lipa na M-Pesa online passkey
    pub passkey: SecretString,
    /// Public URL Safaricom posts results to
    pub callback_url: String,
}

impl std::fmt::Debug for MpesaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpesaConfig")
            .field("environment", &self.environment)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("shortcode", &self.shortcode)
            .field("passkey", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SOLARSHOP_DATABASE_URL")?;
        let host = get_env_or_default("SOLARSHOP_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SOLARSHOP_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SOLARSHOP_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SOLARSHOP_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("SOLARSHOP_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let session_secret = get_validated_secret("SOLARSHOP_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SOLARSHOP_SESSION_SECRET")?;

        let upload_dir = PathBuf::from(get_env_or_default("SOLARSHOP_UPLOAD_DIR", "uploads"));
        let max_upload_bytes = match get_optional_env("SOLARSHOP_MAX_UPLOAD_BYTES") {
            Some(v) => v.parse::<usize>().map_err(|e| {
                ConfigError::InvalidEnvVar("SOLARSHOP_MAX_UPLOAD_BYTES".to_string(), e.to_string())
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let rate_limit = match get_optional_env("SOLARSHOP_RATE_LIMIT") {
            Some(v) => v.parse::<bool>().map_err(|e| {
                ConfigError::InvalidEnvVar("SOLARSHOP_RATE_LIMIT".to_string(), e.to_string())
            })?,
            None => true,
        };

        let email = EmailConfig::from_env()?;
        let mpesa = MpesaConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            upload_dir,
            max_upload_bytes,
            rate_limit,
            email,
            mpesa,
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
        self.base_url.starts_with("https://")
    }
}

impl EmailConfig {
    /// Returns `None` when `SMTP_HOST` is not set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
}

impl MpesaConfig {
    /// Returns `None` when `MPESA_CONSUMER_KEY` is not set. Once the key is
    /// present every other M-Pesa variable is required.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(consumer_key) = get_optional_env("MPESA_CONSUMER_KEY") else {
            return Ok(None);
        };

        let environment = get_env_or_default("MPESA_ENVIRONMENT", "sandbox")
            .parse::<MpesaEnvironment>()
            .map_err(|e| ConfigError::InvalidEnvVar("MPESA_ENVIRONMENT".to_string(), e))?;

        let consumer_secret = get_required_secret("MPESA_CONSUMER_SECRET")?;
        if let Err(e) =
            validate_secret_strength(consumer_secret.expose_secret(), "MPESA_CONSUMER_SECRET")
        {
            tracing::warn!("MPESA_CONSUMER_SECRET validation warning: {e}");
        }

        let shortcode = get_required_env("MPESA_SHORTCODE")?;
        if shortcode.is_empty() || !shortcode.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidEnvVar(
                "MPESA_SHORTCODE".to_string(),
                "must be numeric".to_string(),
            ));
        }

        let callback_url = get_required_env("MPESA_CALLBACK_URL")?;
        url::Url::parse(&callback_url).map_err(|e| {
            ConfigError::InvalidEnvVar("MPESA_CALLBACK_URL".to_string(), e.to_string())
        })?;

        Ok(Some(Self {
            environment,
            consumer_key,
            consumer_secret,
            shortcode,
            passkey: get_required_secret("MPESA_PASSKEY")?,
            callback_url,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from("postgres://localhost/solarshop_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            rate_limit: true,
            email: None,
            mpesa: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("changeme-session-key", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("abababababababababababababababab", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_is_https() {
        let mut config = test_config();
        assert!(!config.is_https());
        config.base_url = "https://shop.example.co.ke".to_string();
        assert!(config.is_https());
    }

    #[test]
    fn test_mpesa_environment_parse() {
        assert_eq!(
            "Sandbox".parse::<MpesaEnvironment>().unwrap(),
            MpesaEnvironment::Sandbox
        );
        assert_eq!(
            "production".parse::<MpesaEnvironment>().unwrap(),
            MpesaEnvironment::Production
        );
        assert!("staging".parse::<MpesaEnvironment>().is_err());
        assert_eq!(
            MpesaEnvironment::Sandbox.base_url(),
            "https://sandbox.safaricom.co.ke"
        );
    }

    #[test]
    fn test_mpesa_config_debug_redacts_secrets() {
        let config = MpesaConfig {
            environment: MpesaEnvironment::Sandbox,
            consumer_key: "consumer_key_value".to_string(),
            consumer_secret: SecretString::from("very_private_consumer_value"),
            shortcode: "174379".to_string(),
            passkey: SecretString::from("very_private_passkey_value"),
            callback_url: "https://shop.example.co.ke/api/payments/mpesa/callback".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("consumer_key_value"));
        assert!(debug_output.contains("174379"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("very_private_consumer_value"));
        assert!(!debug_output.contains("very_private_passkey_value"));
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.example.net".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("hunter2-smtp"),
            from_address: "SolarShop <orders@solarshop.co.ke>".to_string(),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.example.net"));
        assert!(!debug_output.contains("hunter2-smtp"));
    }
}
