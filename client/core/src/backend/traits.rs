//! Chat Backend Traits
//!
//! The trait seam between the conversation controller and the inference
//! service, plus the wire types the service speaks. The HTTP implementation
//! lives in [`super::HttpBackend`]; tests substitute scripted backends.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::BackendError;
use crate::messages::ChatMessage;

/// One decoded server-sent event
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Text fragment to append to the response
    pub content: String,
    /// This is the final chunk of the response
    #[serde(default)]
    pub is_complete: bool,
    /// Model that produced the chunk
    #[serde(default)]
    pub model: String,
}

impl StreamChunk {
    /// A non-final chunk
    pub fn partial(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// The final chunk of a response
    pub fn complete(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_complete: true,
            ..Default::default()
        }
    }

    /// Set the model name
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Lazily decoded sequence of chunks for one response
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, BackendError>>;

/// Body of a chat request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The new user message
    pub message: String,
    /// Prior turns, oldest first
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
    /// Model to use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Whether to stream the response
    pub stream: bool,
}

impl ChatRequest {
    /// Create a streaming request with no history
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_history: Vec::new(),
            model: None,
            max_tokens: None,
            temperature: None,
            stream: true,
        }
    }

    /// Set prior turns
    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.conversation_history = history;
        self
    }

    /// Set model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    /// Set streaming mode
    #[must_use]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Response to a non-streaming chat request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Assistant response text
    pub message: String,
    /// Role of the responder
    #[serde(default = "default_response_role")]
    pub role: String,
    /// Model that generated the response
    pub model: String,
    /// Backend-side conversation id, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

fn default_response_role() -> String {
    "assistant".to_string()
}

/// Models the backend can serve
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsResponse {
    /// Available model names, in backend order
    pub models: Vec<String>,
    /// Model the backend uses when none is specified
    pub default_model: String,
}

/// Backend health report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status ("healthy" when up)
    pub status: String,
    /// Backend API version
    pub version: String,
    /// Model the backend is configured with
    pub model: String,
    /// When the check ran
    pub timestamp: String,
}

/// Inference backend
///
/// Implement this trait to drive the controller from something other than
/// the HTTP service (tests, replays, in-process models).
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Check liveness; every failure maps to `false`
    async fn health_check(&self) -> bool;

    /// List available models
    async fn list_models(&self) -> Result<ModelsResponse, BackendError>;

    /// Open a streaming chat response
    ///
    /// Fails before any chunk is produced when the backend rejects the
    /// request. Failures after streaming began arrive as `Err` items.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChunkStream, BackendError>;

    /// Send a request and wait for the complete response
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError>;
}
