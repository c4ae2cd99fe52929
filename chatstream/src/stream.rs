//! Streamed response fragments.
//!
//! A streamed chat completion arrives as an ordered sequence of
//! [`Fragment`]s. Each one may carry a role marker, a piece of content,
//! both, or neither. Concatenating the content of every fragment in arrival
//! order yields the full response text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::message::Role;
use crate::types::ChatCompletionChunk;

/// One incremental piece of a streamed response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Role marker, usually only on the first fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Partial content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Finish reason, usually only on the last fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl Fragment {
    /// Creates a fragment carrying only a role marker.
    #[must_use]
    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    /// Creates a fragment carrying only content.
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Creates a fragment with neither role nor content.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sets the finish reason.
    #[must_use]
    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    /// Returns the content if present and non-empty.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    /// Returns `true` if this fragment carries non-empty content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.text().is_some()
    }
}

/// Pull-based cursor over the fragments of one streamed response.
///
/// `Ok(None)` is the terminal "exhausted" signal; once returned, the source
/// is closed. An `Err` is terminal as well.
#[async_trait]
pub trait FragmentSource: Send {
    /// Waits for and returns the next fragment.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the connection fails or an event
    /// cannot be decoded.
    async fn next_fragment(&mut self) -> Result<Option<Fragment>, TransportError>;
}

/// Boxed fragment source.
pub type BoxedFragmentSource = Box<dyn FragmentSource>;

impl From<ChatCompletionChunk> for Fragment {
    fn from(chunk: ChatCompletionChunk) -> Self {
        chunk
            .choices
            .into_iter()
            .next()
            .map(|choice| Self {
                role: choice.delta.role,
                content: choice.delta.content,
                finish_reason: choice.finish_reason,
            })
            .unwrap_or_default()
    }
}

/// Decodes one SSE `data` payload into a fragment.
pub(crate) fn decode_fragment(provider: &str, data: &str) -> Result<Fragment, TransportError> {
    let chunk = serde_json::from_str::<ChatCompletionChunk>(data)
        .map_err(|e| TransportError::malformed_fragment(e.to_string(), data))?;

    if let Some(error) = &chunk.error {
        return Err(TransportError::provider(
            provider,
            error.code(),
            error.message.clone(),
        ));
    }

    Ok(chunk.into())
}
