//! Stream Decoding
//!
//! Turns the raw response body of `POST /chat/stream` into a lazy sequence of
//! [`StreamChunk`]s.
//!
//! # Architecture
//!
//! ```text
//! bytes (arbitrary splits)
//!        │
//!        ▼
//! ┌──────────────┐   pending bytes carried across reads,
//! │  SseDecoder  │   split on '\n', `data: ` prefix, [DONE]
//! └──────┬───────┘
//!        │ SseFrame
//!        ▼
//! ┌──────────────┐   termination rules, source release,
//! │decode_chunks │   mid-stream errors
//! └──────┬───────┘
//!        │ Result<StreamChunk, BackendError>
//!        ▼
//!   controller
//! ```
//!
//! The decoder is synchronous and knows nothing about I/O, which keeps it
//! trivially testable; [`decode_chunks`] adapts it to any byte stream.

mod chunk_stream;
mod decoder;

pub use chunk_stream::decode_chunks;
pub use decoder::{SseDecoder, SseFrame, DATA_PREFIX, DONE_SENTINEL};

// Re-export StreamChunk from backend for convenience
pub use crate::backend::StreamChunk;
