//! API gateway configuration.
//!
//! Configuration is loaded from environment variables. The signing secret and
//! the Redis URL are held as `SecretString` and redacted in Debug output.

use crate::auth::exemption::{ExemptionMatcher, PatternError};
use crate::routes::table::{RouteError, RouteTable};
use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Paths reachable without a token.
pub const DEFAULT_EXEMPT_PATHS: &str = "/api/auth/login,/api/account/member/register";

/// Default upstream routes.
pub const DEFAULT_ROUTES: &str =
    "/auth/**=http://localhost:8081,/api/account/**=http://localhost:8082";

/// Default revocation lookup budget in milliseconds.
pub const DEFAULT_REVOCATION_TIMEOUT_MS: u64 = 250;

/// Upper bound for `REVOCATION_TIMEOUT_MS`.
pub const MAX_REVOCATION_TIMEOUT_MS: u64 = 5000;

/// Default whole-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Minimum signing secret length in bytes (HS256 key size).
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// API gateway configuration.
#[derive(Clone)]
pub struct Config {
    /// HMAC secret shared with the token issuer.
    pub jwt_secret: SecretString,

    /// Revocation store URL. May carry credentials.
    pub redis_url: SecretString,

    /// Server bind address (default: "0.0.0.0:8000").
    pub bind_address: String,

    /// Paths that bypass authentication.
    pub exempt_paths: ExemptionMatcher,

    /// Upper bound on one revocation lookup.
    pub revocation_timeout: Duration,

    /// Upper bound on one whole request, forwarding included.
    pub request_timeout: Duration,

    /// Ordered upstream routes.
    pub routes: RouteTable,

    /// Time to keep serving in-flight requests after a shutdown signal.
    pub drain_period: Duration,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("exempt_paths", &self.exempt_paths.rules())
            .field("revocation_timeout", &self.revocation_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("routes", &self.routes.entries())
            .field("drain_period", &self.drain_period)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT secret: {0}")]
    InvalidJwtSecret(String),

    #[error("Invalid path pattern in {var}: {source}")]
    InvalidPattern {
        var: &'static str,
        #[source]
        source: PatternError,
    },

    #[error("Invalid route configuration: {0}")]
    InvalidRoute(#[from] RouteError),

    #[error("Invalid revocation timeout configuration: {0}")]
    InvalidRevocationTimeout(String),

    #[error("Invalid request timeout configuration: {0}")]
    InvalidRequestTimeout(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainPeriod(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwt_secret = vars
            .get("JWT_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;

        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::InvalidJwtSecret(format!(
                "JWT_SECRET must be at least {} bytes, got {}",
                MIN_JWT_SECRET_BYTES,
                jwt_secret.len()
            )));
        }
        let jwt_secret = SecretString::from(jwt_secret.as_str());

        let redis_url = vars
            .get("REDIS_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?;
        let redis_url = SecretString::from(redis_url.as_str());

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let exempt_spec = vars
            .get("AUTH_EXEMPT_PATHS")
            .map_or(DEFAULT_EXEMPT_PATHS, String::as_str);
        let exempt_patterns: Vec<&str> = exempt_spec
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let exempt_paths =
            ExemptionMatcher::from_patterns(&exempt_patterns).map_err(|source| {
                ConfigError::InvalidPattern {
                    var: "AUTH_EXEMPT_PATHS",
                    source,
                }
            })?;

        let revocation_timeout_ms = parse_u64(
            vars,
            "REVOCATION_TIMEOUT_MS",
            DEFAULT_REVOCATION_TIMEOUT_MS,
            ConfigError::InvalidRevocationTimeout,
        )?;
        if revocation_timeout_ms == 0 || revocation_timeout_ms > MAX_REVOCATION_TIMEOUT_MS {
            return Err(ConfigError::InvalidRevocationTimeout(format!(
                "REVOCATION_TIMEOUT_MS must be between 1 and {}, got {}",
                MAX_REVOCATION_TIMEOUT_MS, revocation_timeout_ms
            )));
        }

        let request_timeout_seconds = parse_u64(
            vars,
            "REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
            ConfigError::InvalidRequestTimeout,
        )?;
        if request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidRequestTimeout(
                "REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        let routes = match vars.get("GATEWAY_ROUTES") {
            Some(spec) => RouteTable::parse(spec)?,
            None => RouteTable::parse(DEFAULT_ROUTES)?,
        };

        let drain_seconds = parse_u64(
            vars,
            "GATEWAY_DRAIN_SECONDS",
            0,
            ConfigError::InvalidDrainPeriod,
        )?;

        Ok(Config {
            jwt_secret,
            redis_url,
            bind_address,
            exempt_paths,
            revocation_timeout: Duration::from_millis(revocation_timeout_ms),
            request_timeout: Duration::from_secs(request_timeout_seconds),
            routes,
            drain_period: Duration::from_secs(drain_seconds),
        })
    }

    /// Signing secret length, for startup logging.
    pub fn jwt_secret_len(&self) -> usize {
        self.jwt_secret.expose_secret().len()
    }
}

fn parse_u64(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    err: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value_str) => value_str.trim().parse().map_err(|e| {
            err(format!(
                "{} must be a valid non-negative integer, got '{}': {}",
                name, value_str, e
            ))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "config-test-secret-0123456789abcdef";

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("JWT_SECRET".to_string(), TEST_SECRET.to_string()),
            (
                "REDIS_URL".to_string(),
                "redis://:hunter2@localhost:6379".to_string(),
            ),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.jwt_secret.expose_secret(), TEST_SECRET);
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.revocation_timeout, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.drain_period, Duration::ZERO);

        assert!(!config.exempt_paths.is_secured("/api/auth/login"));
        assert!(!config.exempt_paths.is_secured("/api/account/member/register"));
        assert!(config.exempt_paths.is_secured("/api/account/needAuthorization"));

        assert_eq!(config.routes.entries().len(), 2);
        assert!(config.routes.resolve("/auth/login").is_some());
        assert!(config.routes.resolve("/api/account/x").is_some());
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert(
            "AUTH_EXEMPT_PATHS".to_string(),
            "/public/**, /health".to_string(),
        );
        vars.insert("REVOCATION_TIMEOUT_MS".to_string(), "100".to_string());
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "5".to_string());
        vars.insert(
            "GATEWAY_ROUTES".to_string(),
            "/**=http://backend:9000".to_string(),
        );
        vars.insert("GATEWAY_DRAIN_SECONDS".to_string(), "10".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert!(!config.exempt_paths.is_secured("/public/a/b"));
        assert!(!config.exempt_paths.is_secured("/health"));
        assert!(config.exempt_paths.is_secured("/api/auth/login"));
        assert_eq!(config.revocation_timeout, Duration::from_millis(100));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.routes.entries().len(), 1);
        assert_eq!(config.drain_period, Duration::from_secs(10));
    }

    #[test]
    fn test_empty_exempt_paths_secures_everything() {
        let mut vars = base_vars();
        vars.insert("AUTH_EXEMPT_PATHS".to_string(), String::new());

        let config = Config::from_vars(&vars).unwrap();
        assert!(config.exempt_paths.rules().is_empty());
        assert!(config.exempt_paths.is_secured("/api/auth/login"));
    }

    #[test]
    fn test_from_vars_missing_jwt_secret() {
        let mut vars = base_vars();
        vars.remove("JWT_SECRET");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "JWT_SECRET"));
    }

    #[test]
    fn test_from_vars_missing_redis_url() {
        let mut vars = base_vars();
        vars.remove("REDIS_URL");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "REDIS_URL"));
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut vars = base_vars();
        vars.insert("JWT_SECRET".to_string(), "too-short".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidJwtSecret(_))));
    }

    #[test]
    fn test_invalid_exempt_pattern_rejected() {
        for bad in ["api/auth/login", "/api/**/x", "/api/a*"] {
            let mut vars = base_vars();
            vars.insert("AUTH_EXEMPT_PATHS".to_string(), bad.to_string());

            let result = Config::from_vars(&vars);
            assert!(
                matches!(
                    result,
                    Err(ConfigError::InvalidPattern {
                        var: "AUTH_EXEMPT_PATHS",
                        ..
                    })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_route_rejected() {
        let mut vars = base_vars();
        vars.insert(
            "GATEWAY_ROUTES".to_string(),
            "/auth/**=lb://auth-service".to_string(),
        );

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidRoute(_))));
    }

    #[test]
    fn test_revocation_timeout_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("REVOCATION_TIMEOUT_MS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidRevocationTimeout(_))
        ));
    }

    #[test]
    fn test_revocation_timeout_rejects_too_large() {
        let mut vars = base_vars();
        vars.insert("REVOCATION_TIMEOUT_MS".to_string(), "5001".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidRevocationTimeout(_))
        ));
    }

    #[test]
    fn test_revocation_timeout_accepts_max() {
        let mut vars = base_vars();
        vars.insert("REVOCATION_TIMEOUT_MS".to_string(), "5000".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.revocation_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_revocation_timeout_rejects_non_numeric() {
        let mut vars = base_vars();
        vars.insert("REVOCATION_TIMEOUT_MS".to_string(), "fast".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidRevocationTimeout(msg)) if msg.contains("fast")
        ));
    }

    #[test]
    fn test_request_timeout_rejects_zero() {
        let mut vars = base_vars();
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidRequestTimeout(_))));
    }

    #[test]
    fn test_drain_period_rejects_negative() {
        let mut vars = base_vars();
        vars.insert("GATEWAY_DRAIN_SECONDS".to_string(), "-1".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidDrainPeriod(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::from_vars(&base_vars()).unwrap();
        let debug_str = format!("{:?}", config);

        assert!(!debug_str.contains(TEST_SECRET));
        assert!(!debug_str.contains("hunter2"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("0.0.0.0:8000"));
        assert_eq!(config.jwt_secret_len(), TEST_SECRET.len());
    }
}
