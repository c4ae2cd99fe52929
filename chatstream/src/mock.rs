//! Scripted transport for testing.
//!
//! This module provides a transport that replays a fixed completion and a
//! fixed fragment sequence, useful for unit testing without making real API
//! calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::chat::{ChatRequest, ChatResponse};
use crate::error::TransportError;
use crate::stream::{BoxedFragmentSource, Fragment, FragmentSource};
use crate::transport::Transport;

/// A transport that replays scripted responses.
///
/// # Example
///
/// ```rust,ignore
/// use chatstream::mock::ScriptedTransport;
/// use chatstream::{Fragment, Role};
///
/// let transport = ScriptedTransport::new()
///     .with_fragments(vec![Fragment::role(Role::Assistant), Fragment::content("Two")])
///     .fail_after(1, TransportError::network("connection reset"));
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    completion: Option<ChatResponse>,
    fragments: Vec<Fragment>,
    failure: Option<(usize, TransportError)>,
    open_error: Option<TransportError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    /// Create a transport with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response returned by [`Transport::complete`].
    #[must_use]
    pub fn with_completion(mut self, response: ChatResponse) -> Self {
        self.completion = Some(response);
        self
    }

    /// Script the fragments yielded by every opened stream.
    #[must_use]
    pub fn with_fragments(mut self, fragments: Vec<Fragment>) -> Self {
        self.fragments = fragments;
        self
    }

    /// Script a completion and a matching stream, one fragment per piece.
    ///
    /// The stream opens with a role marker and closes with an empty
    /// fragment carrying a `stop` finish reason.
    #[must_use]
    pub fn echoing<I, S>(pieces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pieces: Vec<String> = pieces.into_iter().map(Into::into).collect();
        let mut fragments = Vec::with_capacity(pieces.len() + 2);
        fragments.push(Fragment::role(crate::Role::Assistant));
        fragments.extend(pieces.iter().cloned().map(Fragment::content));
        fragments.push(Fragment::empty().with_finish_reason("stop"));

        Self::new()
            .with_completion(ChatResponse::from_text(pieces.concat()))
            .with_fragments(fragments)
    }

    /// Wait `delay` before yielding each fragment.
    #[must_use]
    pub const fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every opened stream after yielding `count` fragments.
    #[must_use]
    pub fn fail_after(mut self, count: usize, error: TransportError) -> Self {
        self.failure = Some((count, error));
        self
    }

    /// Fail every request before any fragment is produced.
    #[must_use]
    pub fn fail_on_open(mut self, error: TransportError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Number of requests this transport has received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        let mut response = self.completion.clone().ok_or_else(|| {
            TransportError::response_format("scripted completion", "none configured")
        })?;
        if response.model.is_empty() {
            response.model.clone_from(&request.model);
        }
        Ok(response)
    }

    async fn open_stream(
        &self,
        _request: &ChatRequest,
    ) -> Result<BoxedFragmentSource, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        Ok(Box::new(ScriptedSource {
            fragments: self.fragments.iter().cloned().collect(),
            failure: self.failure.clone(),
            delay: self.delay,
            yielded: 0,
        }))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Debug)]
struct ScriptedSource {
    fragments: VecDeque<Fragment>,
    failure: Option<(usize, TransportError)>,
    delay: Duration,
    yielded: usize,
}

#[async_trait]
impl FragmentSource for ScriptedSource {
    async fn next_fragment(&mut self) -> Result<Option<Fragment>, TransportError> {
        if self
            .failure
            .as_ref()
            .is_some_and(|(count, _)| self.yielded >= *count)
            && let Some((_, err)) = self.failure.take()
        {
            self.fragments.clear();
            return Err(err);
        }

        if self.fragments.is_empty() {
            return Ok(None);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.yielded += 1;
        Ok(self.fragments.pop_front())
    }
}
