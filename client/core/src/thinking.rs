//! Thinking-Segment Parsing
//!
//! Some models emit a deliberative span wrapped in `<think>` … `</think>`
//! before their final answer. The functions here separate that span from
//! the response.
//!
//! Everything in this module is pure and operates on the *whole* accumulated
//! text of a message. Stream chunks are arbitrary fragments, so a marker can
//! straddle two of them; re-scanning the full buffer on every update is the
//! only way to see it. Nothing here caches a split: callers rederive on read.

use serde::{Deserialize, Serialize};

/// Opening marker of a thinking segment
pub const THINK_OPEN: &str = "<think>";

/// Closing marker of a thinking segment
pub const THINK_CLOSE: &str = "</think>";

/// A message's content split into thinking and response parts
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkingContent {
    /// Trimmed text between the markers
    pub thinking: String,
    /// Trimmed text after the closing marker
    pub response: String,
}

/// Byte range of the first complete span
///
/// Returns `(open_start, interior_start, interior_end, close_end)`. The close
/// marker is the first one after the first open marker (non-greedy).
fn find_span(text: &str) -> Option<(usize, usize, usize, usize)> {
    let open_start = text.find(THINK_OPEN)?;
    let interior_start = open_start + THINK_OPEN.len();
    let interior_end = interior_start + text[interior_start..].find(THINK_CLOSE)?;
    Some((
        open_start,
        interior_start,
        interior_end,
        interior_end + THINK_CLOSE.len(),
    ))
}

/// True iff a complete `<think>…</think>` span exists anywhere in `text`
#[must_use]
pub fn has_thinking_segment(text: &str) -> bool {
    find_span(text).is_some()
}

/// True iff an opening marker exists with no closing marker after it
///
/// This is the "still thinking" state of a stream in progress.
#[must_use]
pub fn has_open_thinking(text: &str) -> bool {
    text.contains(THINK_OPEN) && !has_thinking_segment(text)
}

/// Split `text` into thinking and response
///
/// Returns `None` when there is no complete span; the caller then treats the
/// whole text as response content.
#[must_use]
pub fn split_thinking(text: &str) -> Option<ThinkingContent> {
    let (_, interior_start, interior_end, close_end) = find_span(text)?;
    Some(ThinkingContent {
        thinking: text[interior_start..interior_end].trim().to_string(),
        response: text[close_end..].trim().to_string(),
    })
}

/// Remove every complete thinking span and trim the result
///
/// Removal repeats until no span remains, so a span that only forms once an
/// inner one is cut out (`<th<think>x</think>ink>…`) is removed as well and
/// the function is idempotent.
#[must_use]
pub fn strip_thinking(text: &str) -> String {
    let mut out = text.to_string();
    while let Some((open_start, _, _, close_end)) = find_span(&out) {
        out.replace_range(open_start..close_end, "");
    }
    out.trim().to_string()
}

/// Trimmed interior of the first complete span, or an empty string
#[must_use]
pub fn extract_thinking_only(text: &str) -> String {
    find_span(text)
        .map(|(_, start, end, _)| text[start..end].trim().to_string())
        .unwrap_or_default()
}

/// Name patterns that suggest a model emits thinking segments
const THINKING_MODEL_PATTERNS: &[&str] = &["thinking", "reason", "think", "o1"];

/// Best-effort guess whether a model emits thinking segments
///
/// This is a case-insensitive substring match over the model name and
/// nothing more. Treat it as a display hint; backend metadata, when
/// available, is authoritative.
#[must_use]
pub fn is_thinking_model(model_name: &str) -> bool {
    let lower = model_name.to_lowercase();
    THINKING_MODEL_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Presentation view of one message's raw content
///
/// Always derived from the raw content with [`MessageView::derive`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageView {
    /// Thinking text, if the message has (or is inside) a thinking segment
    pub thinking: Option<String>,
    /// Response text to display as the answer
    pub response: String,
    /// The thinking segment has opened but not yet closed
    pub thinking_open: bool,
}

impl MessageView {
    /// Derive the view from raw accumulated content
    ///
    /// - complete span: thinking and response from [`split_thinking`]
    /// - opening marker without a close: everything after the marker is
    ///   in-progress thinking and there is no response yet
    /// - no marker: the whole text is response
    #[must_use]
    pub fn derive(content: &str) -> Self {
        if let Some(split) = split_thinking(content) {
            return Self {
                thinking: Some(split.thinking),
                response: split.response,
                thinking_open: false,
            };
        }

        if let Some(open_start) = content.find(THINK_OPEN) {
            let partial = &content[open_start + THINK_OPEN.len()..];
            return Self {
                thinking: Some(partial.trim().to_string()),
                response: String::new(),
                thinking_open: true,
            };
        }

        Self {
            thinking: None,
            response: content.to_string(),
            thinking_open: false,
        }
    }

    /// Derive the view of content that is still arriving
    ///
    /// Like [`MessageView::derive`], but a trailing fragment of the next
    /// expected marker (`<thi` before any segment, `</thi` inside an open
    /// one) is held back until the chunk that completes or refutes it
    /// arrives. Append-only surfaces never see marker text this way.
    #[must_use]
    pub fn derive_streaming(content: &str) -> Self {
        let held = if has_thinking_segment(content) {
            0
        } else if content.contains(THINK_OPEN) {
            marker_fragment_len(content, THINK_CLOSE)
        } else {
            marker_fragment_len(content, THINK_OPEN)
        };
        Self::derive(&content[..content.len() - held])
    }
}

/// Length of the longest proper prefix of `marker` that `text` ends with
///
/// Markers are ASCII, so the cut always lands on a char boundary.
fn marker_fragment_len(text: &str, marker: &str) -> usize {
    (1..marker.len())
        .rev()
        .find(|&k| text.ends_with(&marker[..k]))
        .unwrap_or(0)
}
