//! Client configuration.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ApiError;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "RELAY_API_KEY";

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "RELAY_API_URL";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Credentials, base URL and connection settings for an `ApiClient`.
#[derive(Clone)]
pub struct ClientConfig {
    pub(crate) api_key: String,
    pub(crate) api_url: String,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) user_agent: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, api_url: &str) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.trim_end_matches('/').to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            user_agent: concat!("relay-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Read `RELAY_API_KEY` and `RELAY_API_URL` from the environment.
    pub fn from_env() -> Result<Self, ApiError> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| ApiError::Config(format!("{API_KEY_ENV} is not set")))?;
        let api_url = std::env::var(API_URL_ENV)
            .map_err(|_| ApiError::Config(format!("{API_URL_ENV} is not set")))?;
        Ok(Self::new(api_key, &api_url))
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Timeout for waiting on the response and reading its body.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Reject configurations that could never produce a request.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.api_key.is_empty() {
            return Err(ApiError::Config("API key is empty".to_string()));
        }
        let url = url::Url::parse(&self.api_url)
            .map_err(|e| ApiError::Config(format!("invalid API URL {:?}: {e}", self.api_url)))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::Config(format!(
                "API URL {:?} cannot be used as a base",
                self.api_url
            )));
        }
        Ok(())
    }

    /// `Authorization` header value: the API key as basic-auth username with
    /// an empty password.
    pub(crate) fn authorization(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:", self.api_key)))
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("key", "https://api.test/v1/");
        assert_eq!(config.api_url(), "https://api.test/v1");
    }

    #[test]
    fn authorization_uses_key_with_empty_password() {
        let config = ClientConfig::new("abc123", "https://api.test/v1");
        // base64("abc123:")
        assert_eq!(config.authorization(), "Basic YWJjMTIzOg==");
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ClientConfig::new("super-secret", "https://api.test/v1");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("https://api.test/v1"));
    }

    #[test]
    fn validate_rejects_bad_urls_and_empty_keys() {
        assert!(ClientConfig::new("key", "https://api.test/v1").validate().is_ok());
        assert!(matches!(
            ClientConfig::new("key", "not a url").validate(),
            Err(ApiError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::new("", "https://api.test/v1").validate(),
            Err(ApiError::Config(_))
        ));
    }

    #[test]
    fn builder_setters_override_defaults() {
        let config = ClientConfig::new("key", "https://api.test/v1")
            .connect_timeout(Duration::from_secs(1))
            .read_timeout(Duration::from_secs(2))
            .user_agent("custom/1.0");
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.read_timeout, Duration::from_secs(2));
        assert_eq!(config.user_agent, "custom/1.0");
    }
}
