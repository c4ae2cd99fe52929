//! The seam between request logic and the network.

use std::sync::Arc;

use async_trait::async_trait;

use crate::chat::{ChatRequest, ChatResponse};
use crate::error::TransportError;
use crate::stream::BoxedFragmentSource;

/// Something that can carry chat completion requests to a model.
///
/// [`ChatClient`](crate::ChatClient) talks HTTP to a real service;
/// [`ScriptedTransport`](crate::mock::ScriptedTransport) replays fixed
/// responses for tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submits a request and waits for the complete response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on any submission or decoding failure.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;

    /// Submits a request and returns a cursor over its fragments.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the stream cannot be opened.
    async fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxedFragmentSource, TransportError>;

    /// Name used in logs and error messages.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        (**self).complete(request).await
    }

    async fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxedFragmentSource, TransportError> {
        (**self).open_stream(request).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Type alias for an Arc-wrapped transport.
pub type SharedTransport = Arc<dyn Transport>;
