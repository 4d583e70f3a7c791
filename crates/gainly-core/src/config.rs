//! Application configuration management.
//!
//! Configuration comes from the environment (optionally seeded from a `.env`
//! file) and covers the identity provider endpoint, the OAuth redirect
//! target and the login route protected views redirect to.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Route unauthenticated visitors are sent to
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Minimum password length accepted by the register form.
/// Matches the provider's default password policy.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// HTTP request timeout in seconds.
/// 30s allows for slow provider responses while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_SITE_URL: &str = "http://localhost:5173";

const ENV_SUPABASE_URL: &str = "GAINLY_SUPABASE_URL";
const ENV_SUPABASE_ANON_KEY: &str = "GAINLY_SUPABASE_ANON_KEY";
const ENV_SITE_URL: &str = "GAINLY_SITE_URL";
const ENV_LOGIN_PATH: &str = "GAINLY_LOGIN_PATH";
const ENV_MIN_PASSWORD_LENGTH: &str = "GAINLY_MIN_PASSWORD_LENGTH";
const ENV_REQUEST_TIMEOUT_SECS: &str = "GAINLY_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Where the provider sends the browser back to after an OAuth sign-in
    pub site_url: String,
    pub login_path: String,
    pub min_password_length: usize,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            site_url: DEFAULT_SITE_URL.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (silently ignore if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let supabase_url = lookup(ENV_SUPABASE_URL)
            .with_context(|| format!("{} is not set", ENV_SUPABASE_URL))?;
        let supabase_anon_key = lookup(ENV_SUPABASE_ANON_KEY)
            .with_context(|| format!("{} is not set", ENV_SUPABASE_ANON_KEY))?;

        let min_password_length = match lookup(ENV_MIN_PASSWORD_LENGTH) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("Invalid {}: {}", ENV_MIN_PASSWORD_LENGTH, raw))?,
            None => defaults.min_password_length,
        };
        let request_timeout_secs = match lookup(ENV_REQUEST_TIMEOUT_SECS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid {}: {}", ENV_REQUEST_TIMEOUT_SECS, raw))?,
            None => defaults.request_timeout_secs,
        };

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            site_url: lookup(ENV_SITE_URL).unwrap_or(defaults.site_url),
            login_path: lookup(ENV_LOGIN_PATH).unwrap_or(defaults.login_path),
            min_password_length,
            request_timeout_secs,
        })
    }

    /// Default redirect target for federated sign-in
    pub fn redirect_target(&self) -> &str {
        &self.site_url
    }
}
