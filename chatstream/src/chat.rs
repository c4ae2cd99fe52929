//! Chat completion requests and blocking responses.

use serde::{Deserialize, Serialize};

use crate::message::{Message, Role};
use crate::usage::Usage;

/// A chat completion request.
///
/// The same request drives both delivery modes; [`stream`](Self::stream)
/// selects incremental delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier. Empty means the client's default model.
    #[serde(default)]
    pub model: String,

    /// Conversation messages, in order.
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Sampling temperature (0.0 to 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Whether to stream the response.
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Creates a new request with the specified model.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Creates a request with the given model and messages.
    #[must_use]
    pub fn with_messages(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    /// Adds a system message.
    #[must_use]
    pub fn system(self, content: impl Into<String>) -> Self {
        self.message(Message::system(content))
    }

    /// Adds a user message.
    #[must_use]
    pub fn user(self, content: impl Into<String>) -> Self {
        self.message(Message::user(content))
    }

    /// Adds an assistant message.
    #[must_use]
    pub fn assistant(self, content: impl Into<String>) -> Self {
        self.message(Message::assistant(content))
    }

    /// Adds a message.
    #[must_use]
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Selects incremental delivery.
    #[must_use]
    pub const fn stream(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Selects a single complete response.
    #[must_use]
    pub const fn blocking(mut self) -> Self {
        self.stream = false;
        self
    }
}

/// One candidate completion in a blocking response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Position of this candidate.
    #[serde(default)]
    pub index: usize,
    /// The generated message.
    pub message: Message,
    /// Why the model stopped generating.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// A complete, non-streamed chat response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Completion ID.
    #[serde(default)]
    pub id: String,
    /// Model that produced the response.
    #[serde(default)]
    pub model: String,
    /// Candidate completions.
    pub choices: Vec<Choice>,
    /// Token usage statistics.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Creates a single-candidate assistant response.
    #[must_use]
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                index: 0,
                message: Message::new(Role::Assistant, content),
                finish_reason: Some("stop".to_owned()),
            }],
            ..Default::default()
        }
    }

    /// Sets usage statistics.
    #[must_use]
    pub const fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Returns the content of the first candidate.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }

    /// Returns the finish reason of the first candidate.
    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.finish_reason.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod chat_request {
        use super::*;

        #[test]
        fn new_creates_with_model() {
            let req = ChatRequest::new("gpt-4o");
            assert_eq!(req.model, "gpt-4o");
            assert!(req.messages.is_empty());
            assert!(req.temperature.is_none());
            assert!(!req.stream);
        }

        #[test]
        fn builder_keeps_message_order() {
            let req = ChatRequest::new("m")
                .system("be brief")
                .user("1+1?")
                .assistant("2")
                .user("and 2+2?");

            let roles: Vec<Role> = req.messages.iter().map(|m| m.role).collect();
            assert_eq!(
                roles,
                vec![Role::System, Role::User, Role::Assistant, Role::User]
            );
        }

        #[test]
        fn stream_and_blocking_toggle() {
            let req = ChatRequest::new("m").stream();
            assert!(req.stream);
            assert!(!req.blocking().stream);
        }

        #[test]
        fn serializes_wire_shape() {
            let req = ChatRequest::new("m").user("1+1?").temperature(0.0).stream();
            let json = serde_json::to_value(&req).unwrap();
            assert_eq!(
                json,
                serde_json::json!({
                    "model": "m",
                    "messages": [{"role": "user", "content": "1+1?"}],
                    "temperature": 0.0,
                    "stream": true
                })
            );
        }

        #[test]
        fn temperature_omitted_when_unset() {
            let json = serde_json::to_value(ChatRequest::new("m")).unwrap();
            assert!(json.get("temperature").is_none());
        }
    }

    mod chat_response {
        use super::*;

        #[test]
        fn deserializes_openai_response() {
            let json = r#"{
                "id": "chatcmpl-123",
                "object": "chat.completion",
                "created": 1677858242,
                "model": "gpt-4o",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Two"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
            }"#;

            let response: ChatResponse = serde_json::from_str(json).unwrap();
            assert_eq!(response.model, "gpt-4o");
            assert_eq!(response.text(), Some("Two"));
            assert_eq!(response.finish_reason(), Some("stop"));
            assert_eq!(response.usage, Some(Usage::new(10, 1)));
        }

        #[test]
        fn text_is_none_without_choices() {
            let response = ChatResponse::default();
            assert!(response.text().is_none());
        }

        #[test]
        fn from_text_builds_assistant_choice() {
            let response = ChatResponse::from_text("hello").with_model("m");
            assert_eq!(response.text(), Some("hello"));
            assert_eq!(response.choices[0].message.role, Role::Assistant);
            assert_eq!(response.model, "m");
        }
    }
}
