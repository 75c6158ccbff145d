//! Chunk Stream
//!
//! Wraps any byte stream (an HTTP body, a test fixture) in an
//! [`SseDecoder`] and yields [`StreamChunk`]s lazily.
//!
//! Termination rules, in the order they are checked:
//!
//! 1. a frame carrying `is_complete` is delivered and then the stream ends
//! 2. the `[DONE]` sentinel ends the stream without yielding anything
//! 3. a byte-source error is yielded once as [`BackendError::Interrupted`]
//! 4. the source ending before 1 or 2 yields [`BackendError::UnexpectedEof`]
//!
//! The byte source is dropped the moment any of these happens, so the
//! underlying connection is released even if the consumer keeps holding the
//! chunk stream. Dropping the chunk stream early releases it as well.
//! Once the stream has ended, every later poll yields `None`.

use std::fmt::Display;
use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};

use super::decoder::{SseDecoder, SseFrame};
use crate::backend::{BackendError, ChunkStream, StreamChunk};

type ByteSource<E> = Pin<Box<dyn Stream<Item = Result<Vec<u8>, E>> + Send>>;

/// State carried between polls of the chunk stream
struct DecodeState<E> {
    /// `None` once the source is exhausted or released
    source: Option<ByteSource<E>>,
    decoder: SseDecoder,
    terminated: bool,
    frames: u64,
}

impl<E> DecodeState<E> {
    /// Release the byte source and stop yielding
    fn finish(&mut self) {
        self.source = None;
        self.terminated = true;
        self.decoder.clear();
        tracing::debug!(
            frames = self.frames,
            skipped = self.decoder.skipped(),
            "Chunk stream finished"
        );
    }

    /// Turn the next buffered frame into a stream step
    ///
    /// `None` means the decoder needs more bytes.
    fn step(&mut self) -> Option<Option<Result<StreamChunk, BackendError>>> {
        match self.decoder.next_frame()? {
            SseFrame::Done => {
                tracing::debug!("Stream finished with [DONE]");
                self.finish();
                Some(None)
            }
            SseFrame::Chunk(chunk) => {
                self.frames += 1;
                if chunk.is_complete {
                    self.finish();
                }
                Some(Some(Ok(chunk)))
            }
        }
    }
}

/// Decode a byte stream into a stream of chunks
pub fn decode_chunks<S, B, E>(source: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: Display + Send + 'static,
{
    let source: ByteSource<E> = Box::pin(source.map(|r| r.map(|b| b.as_ref().to_vec())));
    let state = DecodeState {
        source: Some(source),
        decoder: SseDecoder::new(),
        terminated: false,
        frames: 0,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.terminated {
                return None;
            }

            if let Some(step) = state.step() {
                return step.map(|item| (item, state));
            }

            if state.source.is_none() {
                tracing::warn!(
                    frames = state.frames,
                    "Byte stream closed before end of response"
                );
                state.finish();
                return Some((Err(BackendError::UnexpectedEof), state));
            }

            let source = state.source.as_mut()?;
            match source.next().await {
                Some(Ok(bytes)) => state.decoder.push(&bytes),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Byte stream failed mid-response");
                    state.finish();
                    return Some((Err(BackendError::Interrupted(e.to_string())), state));
                }
                None => {
                    // Exhausted; decode whatever is left, then report EOF
                    state.source = None;
                    state.decoder.close();
                }
            }
        }
    })
    .fuse()
    .boxed()
}
