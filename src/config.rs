use crate::application::retry::RetryPolicy;
use crate::domain::asset::{DEFAULT_ALLOWED_TYPES, DEFAULT_MAX_UPLOAD_BYTES, UploadPolicy};
use crate::error::{CheckoutError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
pub const DEFAULT_CURRENCY: &str = "NGN";
pub const DEFAULT_ORPHAN_QUEUE: &str = ".eventify/orphans.json";

/// Runtime configuration, sourced from `EVENTIFY_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub site_url: String,
    pub api_token: Option<String>,
    pub paystack_public_key: String,
    pub currency: String,
    pub upload: UploadPolicy,
    pub verify: RetryPolicy,
    pub redirect_delay: Duration,
    pub sweep_pause: Duration,
    pub orphan_queue: PathBuf,
}

impl AppConfig {
    /// Loads an optional `.env` file, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Unset or blank keys
    /// take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let allowed_types = match get("EVENTIFY_ALLOWED_IMAGE_TYPES") {
            Some(raw) => raw
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            None => DEFAULT_ALLOWED_TYPES.iter().map(|t| t.to_string()).collect(),
        };

        let attempts = parse_or(&get, "EVENTIFY_VERIFY_ATTEMPTS", 3u32)?;
        if attempts == 0 {
            return Err(CheckoutError::ConfigError(
                "EVENTIFY_VERIFY_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api_url: get("EVENTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            site_url: get("EVENTIFY_SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
            api_token: get("EVENTIFY_API_TOKEN"),
            paystack_public_key: get("PAYSTACK_PUBLIC_KEY").unwrap_or_default(),
            currency: get("EVENTIFY_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            upload: UploadPolicy {
                max_bytes: parse_or(&get, "EVENTIFY_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
                allowed_types,
            },
            verify: RetryPolicy::new(
                attempts,
                Duration::from_millis(parse_or(&get, "EVENTIFY_VERIFY_DELAY_MS", 3000u64)?),
            ),
            redirect_delay: Duration::from_millis(parse_or(
                &get,
                "EVENTIFY_REDIRECT_DELAY_MS",
                1500u64,
            )?),
            sweep_pause: Duration::from_millis(parse_or(&get, "EVENTIFY_SWEEP_PAUSE_MS", 100u64)?),
            orphan_queue: get("EVENTIFY_ORPHAN_QUEUE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ORPHAN_QUEUE)),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            api_token: None,
            paystack_public_key: String::new(),
            currency: DEFAULT_CURRENCY.to_string(),
            upload: UploadPolicy::default(),
            verify: RetryPolicy::default(),
            redirect_delay: Duration::from_millis(1500),
            sweep_pause: Duration::from_millis(100),
            orphan_queue: PathBuf::from(DEFAULT_ORPHAN_QUEUE),
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| CheckoutError::ConfigError(format!("parse {key}={raw}: {e}"))),
        None => Ok(default),
    }
}
