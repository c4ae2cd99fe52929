//! Wire types for the OpenAI-compatible Chat Completions API.
//!
//! These map directly onto request and response JSON and stay internal;
//! the public surface is [`ChatRequest`](crate::ChatRequest),
//! [`ChatResponse`](crate::ChatResponse) and [`Fragment`](crate::Fragment).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{Message, Role};

/// Chat completion request body.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct WireRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub stream: bool,
}

/// Streaming chunk (`chat.completion.chunk`).
#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub(crate) struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Some servers report mid-stream failures as an error event.
    #[serde(default)]
    pub error: Option<ApiError>,
}

/// Choice inside a streaming chunk.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Delta inside a streaming choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ChunkDelta {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Error response body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiError,
}

/// Error details.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
}

impl ApiError {
    /// Returns the error code, falling back to the error type.
    pub fn code(&self) -> Option<String> {
        match &self.code {
            Some(Value::String(code)) => Some(code.clone()),
            Some(Value::Null) | None => self.error_type.clone(),
            Some(other) => Some(other.to_string()),
        }
    }
}
