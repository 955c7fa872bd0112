// src/config.rs
//! Configuration loaded from environment variables.
//!
//! ## Environment Variables
//! - `BACKEND_URL`: base URL of the account service (default: http://localhost:3000)
//! - `RP_ID`: WebAuthn Relying Party ID, the domain credentials bind to (default: localhost)
//! - `RP_ORIGIN`: full origin presented to the authenticator (default: http://localhost:3000)
//! - `RP_NAME`: human-readable application name shown during passkey creation
//! - `REQUEST_TIMEOUT_SECS`: per-request HTTP timeout (default: 10)
//! - `RETRY_ATTEMPTS`: extra attempts for read-only backend calls (default: 2)
//! - `RETRY_BASE_DELAY_MS`: first backoff delay, doubled per attempt (default: 250)
//! - `SESSION_TTL_SECS`: how long a persisted session stays trusted;
//!   `0` disables expiry (default: 30 days)

use anyhow::Result;
use std::env;
use std::time::Duration;

const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Runtime configuration for the identity/session layer.
///
/// The session TTL bounds the trust-on-persisted-session window: a
/// restored record older than the TTL is purged instead of resumed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the account service.
    pub backend_url: String,

    /// Relying Party ID the credentials are bound to.
    pub rp_id: String,

    /// Full origin presented to the authenticator.
    pub rp_origin: String,

    /// Human-readable application name.
    pub rp_name: String,

    /// Per-request HTTP timeout.
    pub request_timeout: Duration,

    /// Extra attempts for read-only backend calls (0 = single attempt).
    pub retry_attempts: u32,

    /// First backoff delay; doubled after every failed attempt.
    pub retry_base_delay: Duration,

    /// Trust window for a persisted session; `None` disables expiry.
    pub session_ttl: Option<Duration>,
}

impl Config {
    /// Loads configuration from the environment, falling back to
    /// defaults suitable for local development.
    pub fn from_env() -> Result<Self> {
        // Load .env if present; absence is not an error
        dotenv::dotenv().ok();

        let session_ttl_secs: u64 = env::var("SESSION_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_SESSION_TTL_SECS.to_string())
            .parse()?;

        Ok(Config {
            backend_url: env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            rp_id: env::var("RP_ID").unwrap_or_else(|_| "localhost".to_string()),
            rp_origin: env::var("RP_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            rp_name: env::var("RP_NAME").unwrap_or_else(|_| "Smart Wallet".to_string()),
            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            ),
            retry_attempts: env::var("RETRY_ATTEMPTS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()?,
            retry_base_delay: Duration::from_millis(
                env::var("RETRY_BASE_DELAY_MS")
                    .unwrap_or_else(|_| "250".to_string())
                    .parse()?,
            ),
            session_ttl: if session_ttl_secs == 0 {
                None
            } else {
                Some(Duration::from_secs(session_ttl_secs))
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend_url: "http://localhost:3000".to_string(),
            rp_id: "localhost".to_string(),
            rp_origin: "http://localhost:3000".to_string(),
            rp_name: "Smart Wallet".to_string(),
            request_timeout: Duration::from_secs(10),
            retry_attempts: 2,
            retry_base_delay: Duration::from_millis(250),
            session_ttl: Some(Duration::from_secs(DEFAULT_SESSION_TTL_SECS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_ttl_is_bounded() {
        let config = Config::default();
        assert_eq!(
            config.session_ttl,
            Some(Duration::from_secs(30 * 24 * 60 * 60))
        );
    }
}
