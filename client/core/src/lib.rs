//! Chatbot Core - Streaming Chat Client Engine
//!
//! This crate holds everything of the chat client that is not terminal
//! glue: talking to the inference service, decoding its chunk stream,
//! separating `<think>` segments from answers, and keeping the conversation
//! consistent while a response is streaming in.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Rendering Surface                         │
//! │               (chatbot-cli, tests, anything)                  │
//! └───────────────▲──────────────────────────────┬───────────────┘
//!                 │ ChatEvent (mpsc)             │ submit / clear
//! ┌───────────────┴──────────────────────────────▼───────────────┐
//! │                      ChatController                           │
//! │   conversation · turn token · single surfaced error           │
//! │        │                                   ▲                  │
//! │        │ ChatRequest                       │ MessageView      │
//! │        ▼                                   │                  │
//! │  ┌────────────┐   bytes   ┌─────────────┐  │  ┌────────────┐  │
//! │  │ ChatBackend├──────────►│decode_chunks├──┴─►│  thinking  │  │
//! │  │   (HTTP)   │           │ (SseDecoder)│     │   parser   │  │
//! │  └────────────┘           └─────────────┘     └────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Data flows one way: network → accumulated text → derived view.
//!
//! # Key Types
//!
//! - [`ChatController`]: runs turns and publishes [`ChatEvent`]s
//! - [`ChatBackend`]: trait seam over the inference service
//! - [`HttpBackend`]: REST implementation of the backend
//! - [`SseDecoder`]: incremental `data: ` line decoder
//! - [`MessageView`]: thinking/response split of a message's content
//! - [`ClientConfig`]: resolved configuration
//!
//! # Quick Start
//!
//! ```ignore
//! use chatbot_core::{config, ChatController, HttpBackend};
//!
//! let config = config::load_config()?;
//! let backend = HttpBackend::from_config(&config)?;
//! let (controller, mut events) = ChatController::new(backend, config.event_channel_capacity);
//!
//! controller.load_models().await?;
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//! });
//! controller.submit("Hello!").await;
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod controller;
pub mod messages;
pub mod streaming;
pub mod thinking;

// Re-exports for convenience
pub use backend::{
    BackendError, ChatBackend, ChatRequest, ChatResponse, ChunkStream, HealthResponse,
    HttpBackend, ModelsResponse, StreamChunk,
};
pub use config::{ClientConfig, ConfigError, ConfigOverrides, ConfigSource};
pub use controller::{
    ChatController, ChatEvent, ConversationSnapshot, RejectReason, RenderUpdate, SubmitOutcome,
    TurnPhase,
};
pub use messages::{ChatMessage, MessageId, MessageRole, TurnId};
pub use streaming::{decode_chunks, SseDecoder, SseFrame};
pub use thinking::{
    extract_thinking_only, has_thinking_segment, is_thinking_model, split_thinking,
    strip_thinking, MessageView, ThinkingContent,
};
