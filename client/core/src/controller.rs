//! Conversation Controller
//!
//! Orchestrates one user → assistant round trip at a time: appends the user
//! message and an empty assistant placeholder, opens a chunk stream, folds
//! every chunk into the placeholder and publishes a render update per chunk.
//!
//! # Turn Lifecycle
//!
//! ```text
//!            submit()
//!   Idle ─────────────► Sending ──► StreamingThinking ──┐
//!    ▲                     │              │             ▼
//!    │                     │              └──────► StreamingResponse
//!    │                     │                            │
//!    │                     ▼                            ▼
//!    └──────────────── Errored                       Settled
//!    └──────────────────────────────────────────────────┘
//! ```
//!
//! `Settled` and `Errored` are reported to the event channel; the controller
//! itself is back at `Idle` as soon as the turn ends.
//!
//! # Design Philosophy
//!
//! The conversation lives behind one `parking_lot::Mutex` and the lock is
//! never held across an `.await`, so every method takes `&self` and
//! [`ChatController::clear`] can run while a [`ChatController::submit`] is
//! suspended on the network. Each turn carries a [`TurnId`]; once the live
//! turn changes (or its placeholder is gone) the old turn stops consuming
//! its stream and discards whatever it was about to write.

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::backend::{BackendError, ChatBackend, ChatRequest};
use crate::messages::{ChatMessage, MessageId, TurnId};
use crate::thinking::{has_open_thinking, MessageView};

// =============================================================================
// Phases, Outcomes and Events
// =============================================================================

/// Where the current turn is in its lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// No turn in flight
    #[default]
    Idle,
    /// Request sent, no chunk received yet
    Sending,
    /// Inside an unclosed thinking segment
    StreamingThinking,
    /// Streaming answer text
    StreamingResponse,
    /// The final chunk was applied
    Settled,
    /// The turn failed and was rolled back
    Errored,
}

impl TurnPhase {
    /// Phase of an in-flight turn given its accumulated content
    #[must_use]
    pub fn for_content(content: &str, is_complete: bool) -> Self {
        if is_complete {
            Self::Settled
        } else if has_open_thinking(content) {
            Self::StreamingThinking
        } else {
            Self::StreamingResponse
        }
    }
}

/// Why a submit was ignored
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The message was empty or whitespace-only
    EmptyMessage,
    /// Another turn is still in flight
    TurnInFlight,
    /// No model has been selected
    NoModelSelected,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "message is empty"),
            Self::TurnInFlight => write!(f, "a response is still streaming"),
            Self::NoModelSelected => write!(f, "no model selected"),
        }
    }
}

/// Result of [`ChatController::submit`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing happened
    Rejected(RejectReason),
    /// The assistant message was filled in and settled
    Completed {
        /// Turn that completed
        turn: TurnId,
        /// The assistant message
        message_id: MessageId,
    },
    /// The turn failed and its placeholder was removed
    Failed {
        /// Turn that failed
        turn: TurnId,
        /// Surfaced error text
        error: String,
    },
    /// The conversation was cleared while the turn was running
    Discarded {
        /// Turn whose updates were dropped
        turn: TurnId,
    },
}

/// One render-state update for the in-flight assistant message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderUpdate {
    /// Turn this update belongs to
    pub turn: TurnId,
    /// The assistant message being filled in
    pub message_id: MessageId,
    /// Full accumulated raw content
    pub content: String,
    /// Phase after applying the chunk
    pub phase: TurnPhase,
    /// Presentation split of `content`
    pub view: MessageView,
}

/// Events published to the rendering surface
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    /// User message and placeholder were appended
    TurnStarted {
        /// New turn
        turn: TurnId,
        /// The appended user message
        user_message: ChatMessage,
        /// Id of the empty assistant placeholder
        placeholder_id: MessageId,
    },
    /// The assistant message changed
    Render(RenderUpdate),
    /// The turn was rolled back
    TurnFailed {
        /// Failed turn
        turn: TurnId,
        /// Surfaced error text
        error: String,
    },
    /// The conversation was emptied
    Cleared,
}

impl ChatEvent {
    /// Phase the event reports
    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        match self {
            Self::TurnStarted { .. } => TurnPhase::Sending,
            Self::Render(update) => update.phase,
            Self::TurnFailed { .. } => TurnPhase::Errored,
            Self::Cleared => TurnPhase::Idle,
        }
    }
}

/// Point-in-time copy of the controller state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationSnapshot {
    /// Conversation in insertion order
    pub messages: Vec<ChatMessage>,
    /// Current phase
    pub phase: TurnPhase,
    /// The surfaced error, if any
    pub error: Option<String>,
    /// Selected model, if any
    pub selected_model: Option<String>,
}

// =============================================================================
// Shared State
// =============================================================================

#[derive(Debug, Default)]
struct ChatState {
    messages: Vec<ChatMessage>,
    phase: TurnPhase,
    error: Option<String>,
    models: Vec<String>,
    selected_model: Option<String>,
    /// Last issued generation; bumped by every submit and every clear
    generation: TurnId,
    in_flight: Option<TurnId>,
}

impl ChatState {
    /// The turn still owns the conversation and its placeholder exists
    fn is_live(&self, turn: TurnId, placeholder: MessageId) -> bool {
        self.in_flight == Some(turn) && self.messages.iter().any(|m| m.id == placeholder)
    }

    fn message_mut(&mut self, id: MessageId) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    fn end_turn(&mut self) {
        self.in_flight = None;
        self.phase = TurnPhase::Idle;
    }
}

/// Rolls back a turn whose `submit` future is dropped mid-flight
///
/// Every path through `submit` ends or abandons the turn itself, after which
/// the turn is no longer live and dropping the guard does nothing.
struct TurnGuard<'a> {
    state: &'a Mutex<ChatState>,
    turn: TurnId,
    placeholder: MessageId,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.is_live(self.turn, self.placeholder) {
            state.messages.retain(|m| m.id != self.placeholder);
            state.end_turn();
            tracing::debug!(turn = %self.turn, "Turn cancelled by caller, placeholder removed");
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Drives conversations against a [`ChatBackend`]
pub struct ChatController<B> {
    backend: B,
    state: Arc<Mutex<ChatState>>,
    events: mpsc::Sender<ChatEvent>,
}

impl<B: ChatBackend> ChatController<B> {
    /// Create a controller and the receiving end of its event channel
    ///
    /// The channel is bounded; a full channel suspends the turn until the
    /// surface catches up.
    pub fn new(backend: B, event_capacity: usize) -> (Self, mpsc::Receiver<ChatEvent>) {
        let (events, rx) = mpsc::channel(event_capacity.max(1));
        let controller = Self {
            backend,
            state: Arc::new(Mutex::new(ChatState::default())),
            events,
        };
        (controller, rx)
    }

    /// The backend this controller talks to
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // -------------------------------------------------------------------------
    // Models
    // -------------------------------------------------------------------------

    /// Fetch the model list, selecting the backend default if nothing is
    /// selected yet
    ///
    /// # Errors
    ///
    /// Returns the backend error, which is also surfaced as the current error.
    pub async fn load_models(&self) -> Result<Vec<String>, BackendError> {
        match self.backend.list_models().await {
            Ok(response) => {
                let mut state = self.state.lock();
                state.models = response.models.clone();
                if state.selected_model.is_none() && !response.default_model.is_empty() {
                    tracing::info!(model = %response.default_model, "Selected default model");
                    state.selected_model = Some(response.default_model);
                }
                Ok(response.models)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load models");
                self.state.lock().error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Select the model used for subsequent turns
    pub fn select_model(&self, model: impl Into<String>) {
        let model = model.into();
        let mut state = self.state.lock();
        if !state.models.is_empty() && !state.models.contains(&model) {
            tracing::warn!(model = %model, "Selected model is not in the backend's list");
        }
        state.selected_model = Some(model);
    }

    /// Models reported by the last successful [`Self::load_models`]
    pub fn models(&self) -> Vec<String> {
        self.state.lock().models.clone()
    }

    /// Currently selected model
    pub fn selected_model(&self) -> Option<String> {
        self.state.lock().selected_model.clone()
    }

    /// Backend liveness
    pub async fn health_check(&self) -> bool {
        self.backend.health_check().await
    }

    // -------------------------------------------------------------------------
    // Read Accessors
    // -------------------------------------------------------------------------

    /// Copy of the whole visible state
    pub fn snapshot(&self) -> ConversationSnapshot {
        let state = self.state.lock();
        ConversationSnapshot {
            messages: state.messages.clone(),
            phase: state.phase,
            error: state.error.clone(),
            selected_model: state.selected_model.clone(),
        }
    }

    /// Conversation in insertion order
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().messages.clone()
    }

    /// The surfaced error, if any
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Current phase
    pub fn phase(&self) -> TurnPhase {
        self.state.lock().phase
    }

    // -------------------------------------------------------------------------
    // Turns
    // -------------------------------------------------------------------------

    /// Empty the conversation and the surfaced error
    ///
    /// A turn that is still streaming keeps running until its next chunk,
    /// then notices it is stale, drops its stream and writes nothing.
    pub async fn clear(&self) {
        {
            let mut state = self.state.lock();
            state.messages.clear();
            state.error = None;
            state.generation = state.generation.next();
            if let Some(turn) = state.in_flight.take() {
                tracing::debug!(%turn, "Cleared conversation with a turn in flight");
            }
            state.phase = TurnPhase::Idle;
        }
        self.publish(ChatEvent::Cleared).await;
    }

    /// Send a user message and stream the assistant response into the
    /// conversation
    ///
    /// Resolves when the turn ends. Empty input, a turn already in flight or
    /// a missing model selection reject the call without touching the
    /// conversation or the backend.
    ///
    /// Dropping the returned future before it resolves rolls the turn back:
    /// the placeholder is removed and the controller returns to `Idle`.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();

        let (turn, placeholder_id, user_message, request) = {
            let mut state = self.state.lock();
            if text.is_empty() {
                return SubmitOutcome::Rejected(RejectReason::EmptyMessage);
            }
            if state.in_flight.is_some() {
                return SubmitOutcome::Rejected(RejectReason::TurnInFlight);
            }
            let Some(model) = state.selected_model.clone() else {
                return SubmitOutcome::Rejected(RejectReason::NoModelSelected);
            };

            // The backend sees prior turns only
            let request = ChatRequest::new(text)
                .with_history(state.messages.clone())
                .with_model(model);

            let user_message = ChatMessage::user(text);
            let placeholder = ChatMessage::placeholder();
            let placeholder_id = placeholder.id;

            state.generation = state.generation.next();
            let turn = state.generation;
            state.messages.push(user_message.clone());
            state.messages.push(placeholder);
            state.error = None;
            state.phase = TurnPhase::Sending;
            state.in_flight = Some(turn);

            (turn, placeholder_id, user_message, request)
        };
        let _guard = TurnGuard {
            state: &self.state,
            turn,
            placeholder: placeholder_id,
        };

        tracing::info!(%turn, model = ?request.model, "Turn started");
        self.publish(ChatEvent::TurnStarted {
            turn,
            user_message,
            placeholder_id,
        })
        .await;

        let mut stream = match self.backend.stream_chat(&request).await {
            Ok(stream) => stream,
            Err(e) => return self.fail(turn, placeholder_id, &e).await,
        };

        let mut buffer = String::new();
        let mut chunks = 0usize;
        let mut settled = false;

        while let Some(item) = stream.next().await {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(stream);
                    return self.fail(turn, placeholder_id, &e).await;
                }
            };

            chunks += 1;
            buffer.push_str(&chunk.content);
            let phase = TurnPhase::for_content(&buffer, chunk.is_complete);

            let Some(update) = self.apply(turn, placeholder_id, &buffer, phase) else {
                tracing::debug!(%turn, chunks, "Discarding stale turn");
                return SubmitOutcome::Discarded { turn };
            };
            self.publish(ChatEvent::Render(update)).await;

            if chunk.is_complete {
                settled = true;
                break;
            }
        }
        drop(stream);

        if !settled {
            // Sentinel end without a completion chunk
            let Some(update) = self.apply(turn, placeholder_id, &buffer, TurnPhase::Settled) else {
                return SubmitOutcome::Discarded { turn };
            };
            self.publish(ChatEvent::Render(update)).await;
        }

        {
            let mut state = self.state.lock();
            if !state.is_live(turn, placeholder_id) {
                return SubmitOutcome::Discarded { turn };
            }
            state.end_turn();
        }

        tracing::info!(%turn, chunks, bytes = buffer.len(), "Turn settled");
        SubmitOutcome::Completed {
            turn,
            message_id: placeholder_id,
        }
    }

    /// Overwrite the placeholder with the accumulated buffer
    ///
    /// Returns `None` when the turn is no longer live.
    fn apply(
        &self,
        turn: TurnId,
        placeholder: MessageId,
        buffer: &str,
        phase: TurnPhase,
    ) -> Option<RenderUpdate> {
        let mut state = self.state.lock();
        if !state.is_live(turn, placeholder) {
            return None;
        }
        state.message_mut(placeholder)?.content = buffer.to_string();
        state.phase = phase;

        Some(RenderUpdate {
            turn,
            message_id: placeholder,
            content: buffer.to_string(),
            phase,
            view: if phase == TurnPhase::Settled {
                MessageView::derive(buffer)
            } else {
                MessageView::derive_streaming(buffer)
            },
        })
    }

    /// Roll back the assistant side of a failed turn
    async fn fail(&self, turn: TurnId, placeholder: MessageId, err: &BackendError) -> SubmitOutcome {
        let error = err.to_string();
        {
            let mut state = self.state.lock();
            if !state.is_live(turn, placeholder) {
                tracing::debug!(%turn, error = %error, "Stale turn failed after clear");
                return SubmitOutcome::Discarded { turn };
            }
            state.messages.retain(|m| m.id != placeholder);
            state.error = Some(error.clone());
            state.end_turn();
        }

        tracing::warn!(%turn, error = %error, mid_stream = err.is_mid_stream(), "Turn failed");
        self.publish(ChatEvent::TurnFailed {
            turn,
            error: error.clone(),
        })
        .await;

        SubmitOutcome::Failed { turn, error }
    }

    /// Send an event to the surface
    async fn publish(&self, event: ChatEvent) {
        if let Err(e) = self.events.send(event).await {
            tracing::debug!("Event receiver dropped: {}", e);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
