//! Inference Backend Integration
//!
//! Abstracted access to the chat inference service through a common trait.
//!
//! # Available Backends
//!
//! - **Http**: the REST service (`/models`, `/health`, `/chat`, `/chat/stream`)
//!
//! # Usage
//!
//! ```ignore
//! use chatbot_core::backend::{ChatBackend, ChatRequest, HttpBackend};
//! use futures::StreamExt;
//!
//! let backend = HttpBackend::new("http://localhost:8000/api/v1")?;
//! let request = ChatRequest::new("Hello!").with_model("qwen3:1.7b");
//! let mut chunks = backend.stream_chat(&request).await?;
//! while let Some(chunk) = chunks.next().await {
//!     print!("{}", chunk?.content);
//! }
//! ```

mod error;
mod http;
mod traits;

pub use error::BackendError;
pub use http::HttpBackend;
pub use traits::{
    ChatBackend, ChatRequest, ChatResponse, ChunkStream, HealthResponse, ModelsResponse,
    StreamChunk,
};
