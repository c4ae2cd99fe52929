//! HTTP client for OpenAI-compatible chat completion APIs.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::chat::{ChatRequest, ChatResponse};
use crate::config::ClientConfig;
use crate::error::{ConfigError, TransportError};
use crate::sse::{SseDecoder, SseEvent};
use crate::stream::{BoxedFragmentSource, Fragment, FragmentSource, decode_fragment};
use crate::transport::Transport;
use crate::types::{ApiErrorResponse, WireRequest};

const PROVIDER: &str = "openai";

/// Chat completion API client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    config: Arc<ClientConfig>,
    client: Client,
}

impl ChatClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Create a client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if `OPENAI_API_KEY` is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get the default model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the chat completions URL.
    pub(crate) fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Build the request body, filling in the default model.
    pub(crate) fn build_body<'a>(
        &'a self,
        request: &'a ChatRequest,
        stream: bool,
    ) -> WireRequest<'a> {
        let model = if request.model.is_empty() {
            self.config.model.as_str()
        } else {
            request.model.as_str()
        };

        WireRequest {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            stream,
        }
    }

    async fn send(
        &self,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, TransportError> {
        let url = self.chat_url();
        let body = self.build_body(request, stream);

        tracing::debug!(
            url = %url,
            model = body.model,
            messages = body.messages.len(),
            stream,
            "sending chat completion request"
        );

        let mut req = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header(CONTENT_TYPE, "application/json");
        if stream {
            req = req.header(ACCEPT, "text/event-stream");
        }

        let response = req.json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "chat completion request failed");
            return Err(Self::parse_error(status.as_u16(), &error_text));
        }

        Ok(response)
    }

    /// Parse an error response body.
    pub(crate) fn parse_error(status: u16, body: &str) -> TransportError {
        if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(body) {
            let error = error_response.error;
            return match status {
                401 => TransportError::auth(PROVIDER, error.message),
                429 => TransportError::rate_limited(PROVIDER),
                _ => TransportError::provider(PROVIDER, error.code(), error.message),
            };
        }

        match status {
            401 => TransportError::auth(PROVIDER, body.to_owned()),
            429 => TransportError::rate_limited(PROVIDER),
            _ => TransportError::http_status(status, body.to_owned()),
        }
    }
}

#[async_trait]
impl Transport for ChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let response = self.send(request, false).await?;
        let response_text = response.text().await?;

        let parsed: ChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            TransportError::response_format(
                "valid chat completion response",
                format!("parse error: {e}, response: {response_text}"),
            )
        })?;

        if parsed.choices.is_empty() {
            return Err(TransportError::response_format(
                "at least one choice",
                "empty choices",
            ));
        }

        Ok(parsed)
    }

    async fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxedFragmentSource, TransportError> {
        let response = self.send(request, true).await?;
        Ok(Box::new(SseFragmentSource::new(response.bytes_stream())))
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Fragment cursor over an SSE response body.
struct SseFragmentSource {
    body: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<Fragment>,
    /// Error decoded behind fragments still in `pending`.
    failed: Option<TransportError>,
    closed: bool,
}

impl SseFragmentSource {
    fn new(body: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static) -> Self {
        Self {
            body: Box::pin(body),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            failed: None,
            closed: false,
        }
    }

    fn enqueue(&mut self, events: impl IntoIterator<Item = SseEvent>) {
        for event in events {
            if self.closed {
                break;
            }
            match event {
                SseEvent::Done => self.closed = true,
                SseEvent::Malformed(data) => {
                    tracing::warn!("stream event is not valid UTF-8");
                    self.failed = Some(TransportError::malformed_fragment(
                        "event is not valid UTF-8",
                        data,
                    ));
                    self.closed = true;
                }
                SseEvent::Data(data) => match decode_fragment(PROVIDER, &data) {
                    Ok(fragment) => self.pending.push_back(fragment),
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to decode stream event");
                        self.failed = Some(e);
                        self.closed = true;
                    }
                },
            }
        }
    }
}

#[async_trait]
impl FragmentSource for SseFragmentSource {
    async fn next_fragment(&mut self) -> Result<Option<Fragment>, TransportError> {
        loop {
            if let Some(fragment) = self.pending.pop_front() {
                return Ok(Some(fragment));
            }
            if let Some(err) = self.failed.take() {
                return Err(err);
            }
            if self.closed {
                return Ok(None);
            }

            match self.body.next().await {
                Some(Ok(bytes)) => {
                    let events = self.decoder.feed(&bytes);
                    self.enqueue(events);
                }
                Some(Err(e)) => {
                    self.closed = true;
                    return Err(e.into());
                }
                None => {
                    let tail = self.decoder.finish();
                    self.enqueue(tail);
                    self.closed = true;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ChatClient {
        ChatClient::new(ClientConfig::new("sk-test").with_model("default-model")).unwrap()
    }

    fn source_from(chunks: Vec<&'static str>) -> SseFragmentSource {
        source_from_bytes(chunks.into_iter().map(str::as_bytes).collect())
    }

    fn source_from_bytes(chunks: Vec<&'static [u8]>) -> SseFragmentSource {
        let items: Vec<reqwest::Result<Bytes>> = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect();
        SseFragmentSource::new(futures::stream::iter(items))
    }

    #[test]
    fn test_new_rejects_blank_key() {
        let err = ChatClient::new(ClientConfig::new("")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }

    #[test]
    fn test_chat_url() {
        let config = ClientConfig::new("k").with_base_url("http://localhost:1/v1/");
        let client = ChatClient::new(config).unwrap();
        assert_eq!(client.chat_url(), "http://localhost:1/v1/chat/completions");
    }

    #[test]
    fn test_build_body_default_model() {
        let client = client();
        let request = ChatRequest::new("").user("hi");
        let body = client.build_body(&request, true);
        assert_eq!(body.model, "default-model");
        assert!(body.stream);

        let request = ChatRequest::new("explicit").user("hi").stream();
        let body = client.build_body(&request, false);
        assert_eq!(body.model, "explicit");
        assert!(!body.stream);
    }

    #[test]
    fn test_parse_error_variants() {
        let body = r#"{"error":{"message":"Incorrect API key","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        assert!(matches!(
            ChatClient::parse_error(401, body),
            TransportError::Auth { .. }
        ));
        assert!(matches!(
            ChatClient::parse_error(429, body),
            TransportError::RateLimited { .. }
        ));
        assert!(matches!(
            ChatClient::parse_error(404, body),
            TransportError::Provider { code: Some(ref c), .. } if c == "invalid_api_key"
        ));
        assert_eq!(
            ChatClient::parse_error(502, "Bad Gateway"),
            TransportError::http_status(502, "Bad Gateway")
        );
    }

    #[tokio::test]
    async fn test_source_yields_fragments_in_order() {
        let mut source = source_from(vec![
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Tw\"}}]}\n\ndata: {\"choi",
            "ces\":[{\"delta\":{\"content\":\"o\"}}]}\n\n",
            "data: [DONE]\n\n",
        ]);

        let first = source.next_fragment().await.unwrap().unwrap();
        assert_eq!(first, Fragment::role(crate::Role::Assistant));
        assert_eq!(
            source.next_fragment().await.unwrap(),
            Some(Fragment::content("Tw"))
        );
        assert_eq!(
            source.next_fragment().await.unwrap(),
            Some(Fragment::content("o"))
        );
        assert_eq!(source.next_fragment().await.unwrap(), None);
        assert_eq!(source.next_fragment().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_source_ends_without_done() {
        let mut source = source_from(vec!["data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}"]);
        assert_eq!(
            source.next_fragment().await.unwrap(),
            Some(Fragment::content("x"))
        );
        assert_eq!(source.next_fragment().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_source_ignores_events_after_done() {
        let mut source = source_from(vec![
            "data: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n",
        ]);
        assert_eq!(source.next_fragment().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_source_rejects_invalid_utf8_event() {
        let mut source = source_from_bytes(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n".as_slice(),
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\xFFb\"}}]}\n\n".as_slice(),
        ]);

        assert_eq!(
            source.next_fragment().await.unwrap(),
            Some(Fragment::content("a"))
        );
        let err = source.next_fragment().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::MalformedFragment { ref data, .. } if data.contains('\u{FFFD}')
        ));
        assert_eq!(source.next_fragment().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_source_delivers_fragments_before_malformed_event() {
        let mut source = source_from(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\ndata: not-json\n\n",
        ]);
        assert_eq!(
            source.next_fragment().await.unwrap(),
            Some(Fragment::content("a"))
        );
        let err = source.next_fragment().await.unwrap_err();
        assert!(matches!(err, TransportError::MalformedFragment { .. }));
        assert_eq!(source.next_fragment().await.unwrap(), None);
    }
}
