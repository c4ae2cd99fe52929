//! Client configuration.

use std::fmt;

use crate::error::ConfigError;

/// Configuration for the chat client.
///
/// Built once at startup and passed by value into
/// [`ChatClient::new`](crate::ChatClient::new). Nothing here touches the
/// process environment after it has been read.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Credential sent as a bearer token.
    pub api_key: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Default model, used when a request leaves its model empty.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Variable holding the credential.
    pub const API_KEY_VAR: &'static str = "OPENAI_API_KEY";
    /// Variable overriding the base URL.
    pub const BASE_URL_VAR: &'static str = "OPENAI_BASE_URL";
    /// Variable overriding the default model.
    pub const MODEL_VAR: &'static str = "OPENAI_MODEL";
    /// Default API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Creates a new configuration with the given credential.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            model: Self::DEFAULT_MODEL.to_owned(),
            timeout_secs: Some(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads from:
    /// - `OPENAI_API_KEY` - Required credential
    /// - `OPENAI_BASE_URL` - Optional base URL
    /// - `OPENAI_MODEL` - Optional default model
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if the credential is unset
    /// or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup.
    ///
    /// Same rules as [`from_env`](Self::from_env), with `lookup` standing in
    /// for the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if the credential is absent
    /// or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(Self::API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::missing_credential(Self::API_KEY_VAR))?;

        let mut config = Self::new(api_key);

        if let Some(url) = lookup(Self::BASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            config = config.with_base_url(url);
        }
        if let Some(model) = lookup(Self::MODEL_VAR).filter(|v| !v.trim().is_empty()) {
            config = config.with_model(model);
        }

        tracing::debug!(base_url = %config.base_url, model = %config.model, "loaded client config");
        Ok(config)
    }

    /// Sets the base URL. A trailing slash is dropped.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.trim_end_matches('/').to_owned();
        self
    }

    /// Sets the default model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Disables the request timeout.
    #[must_use]
    pub const fn without_timeout(mut self) -> Self {
        self.timeout_secs = None;
        self
    }

    /// Checks that the configuration can be used to build a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is blank, the base URL is not an
    /// `http(s)` URL, or the timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::missing_credential(Self::API_KEY_VAR));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::invalid_value(format!(
                "base URL must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::invalid_value("timeout must be non-zero"));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
