//! Error types for chatstream.
//!
//! Two failure kinds exist:
//! - [`ConfigError`] is raised while building a client configuration, before
//!   any request is issued.
//! - [`TransportError`] covers everything that can go wrong once a request is
//!   submitted: connection failures, non-success statuses, malformed payloads.
//!
//! Both fold into the crate-level [`Error`] via `?`.

use crate::consumer::Consumption;

/// Result type alias for chatstream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for chatstream.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration could not be built.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A request or stream failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Error raised while building a [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The credential variable is unset or blank.
    #[error("{var} environment variable not set")]
    MissingCredential {
        /// Name of the variable that was looked up.
        var: String,
    },

    /// A configuration value could not be used.
    #[error("invalid config value: {0}")]
    InvalidValue(String),

    /// The HTTP client could not be constructed from the configuration.
    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    /// Create a missing credential error.
    #[must_use]
    pub fn missing_credential(var: impl Into<String>) -> Self {
        Self::MissingCredential { var: var.into() }
    }

    /// Create an invalid value error.
    #[must_use]
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }
}

/// Error raised while submitting a request or pulling stream fragments.
///
/// Transport errors are terminal for the operation that raised them; nothing
/// in this crate retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Network or connection failure.
    #[error("{0}")]
    Network(String),

    /// The service rejected the credential.
    #[error("[{provider}] {message}")]
    Auth {
        /// Transport name.
        provider: String,
        /// Error description.
        message: String,
    },

    /// The service is throttling requests.
    #[error("[{provider}] rate limit exceeded")]
    RateLimited {
        /// Transport name.
        provider: String,
    },

    /// Non-success status with an unstructured body.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Structured error reported by the service.
    #[error("[{provider}] {message}")]
    Provider {
        /// Transport name.
        provider: String,
        /// Error description.
        message: String,
        /// Error code reported by the service.
        code: Option<String>,
    },

    /// A stream event could not be decoded into a fragment.
    #[error("malformed fragment: {reason}, data: {data}")]
    MalformedFragment {
        /// Decoder error.
        reason: String,
        /// The raw event payload.
        data: String,
    },

    /// A blocking response did not have the expected shape.
    #[error("expected {expected}, got {got}")]
    ResponseFormat {
        /// Expected format description.
        expected: String,
        /// Actual payload description.
        got: String,
    },

    /// The request was rejected before submission.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Create a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Auth {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a rate limit error.
    #[must_use]
    pub fn rate_limited(provider: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
        }
    }

    /// Create an HTTP status error.
    #[must_use]
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a provider error with an optional code.
    #[must_use]
    pub fn provider(
        provider: impl Into<String>,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            code,
        }
    }

    /// Create a malformed fragment error.
    #[must_use]
    pub fn malformed_fragment(reason: impl Into<String>, data: impl Into<String>) -> Self {
        Self::MalformedFragment {
            reason: reason.into(),
            data: data.into(),
        }
    }

    /// Create a response format error.
    #[must_use]
    pub fn response_format(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::ResponseFormat {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("request timed out")
        } else if err.is_connect() {
            Self::network(format!("connection failed: {err}"))
        } else {
            Self::network(err.to_string())
        }
    }
}

/// A stream that failed part-way through.
///
/// Carries the underlying [`TransportError`] together with every fragment
/// received before the failure, so callers can inspect the partial log.
#[derive(Debug, Clone, thiserror::Error)]
#[error("stream interrupted after {} fragments: {error}", .partial.fragment_count())]
pub struct Interrupted {
    /// The failure that ended the stream.
    #[source]
    pub error: TransportError,
    /// Fragments received before the failure.
    pub partial: Consumption,
}

impl Interrupted {
    /// Splits into the error and the partial consumption.
    #[must_use]
    pub fn into_parts(self) -> (TransportError, Consumption) {
        (self.error, self.partial)
    }
}

impl From<Interrupted> for Error {
    fn from(err: Interrupted) -> Self {
        Self::Transport(err.error)
    }
}
