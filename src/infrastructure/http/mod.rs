//! reqwest adapters for the Eventify backend and the site's blob proxy.

pub mod backend;
pub mod blob;

pub use backend::BackendClient;
pub use blob::BlobProxyClient;

use crate::error::{CheckoutError, Result};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The `{status, message, data}` wrapper every backend response uses.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub status: String,
    #[serde(default, alias = "error")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }

    /// The backend's message, or the HTTP reason when it sent none.
    pub fn message_or(&self, status: StatusCode) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            })
    }
}

pub(crate) fn build_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

pub(crate) fn parse_base(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| CheckoutError::ConfigError(format!("Invalid base URL '{raw}': {e}")))
}

/// Appends `path` to `base` one segment at a time so ids and references
/// are percent-encoded.
pub(crate) fn join(base: &Url, path: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| CheckoutError::ConfigError(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(path.split('/').filter(|s| !s.is_empty()));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_keeps_base_path() {
        let base = parse_base("http://localhost:8080/api/v1/").unwrap();
        assert_eq!(
            join(&base, "payments/verify/ref 1").unwrap().as_str(),
            "http://localhost:8080/api/v1/payments/verify/ref%201"
        );
        assert_eq!(
            join(&parse_base("http://site.test").unwrap(), "/api/vendor-image")
                .unwrap()
                .as_str(),
            "http://site.test/api/vendor-image"
        );
    }

    #[test]
    fn test_bad_base_is_config_error() {
        assert!(matches!(
            parse_base("not a url"),
            Err(CheckoutError::ConfigError(_))
        ));
    }

    #[test]
    fn test_envelope_message_fallback() {
        let env: Envelope<()> = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert!(!env.is_success());
        assert_eq!(env.message_or(StatusCode::CONFLICT), "Conflict");

        let env: Envelope<()> =
            serde_json::from_str(r#"{"status":"error","error":"Tier sold out"}"#).unwrap();
        assert_eq!(env.message_or(StatusCode::BAD_REQUEST), "Tier sold out");
    }
}
