//! Terminal Rendering
//!
//! Turns [`ChatEvent`]s into incremental terminal output. Every render
//! update carries the whole accumulated message, so the renderer remembers
//! what it already printed and writes only the new suffix.
//!
//! Thinking text is printed dimmed between `[thinking]` and `[/thinking]`
//! lines; the answer follows it.

use std::io::{self, Write};

use chatbot_core::{ChatEvent, RenderUpdate, TurnPhase};

const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Incremental writer for one conversation
pub struct Renderer<W> {
    out: W,
    color: bool,
    shown_thinking: String,
    shown_response: String,
    thinking_header: bool,
    thinking_closed: bool,
}

impl<W: Write> Renderer<W> {
    /// Create a renderer writing to `out`
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            shown_thinking: String::new(),
            shown_response: String::new(),
            thinking_header: false,
            thinking_closed: false,
        }
    }

    /// Consume the renderer and return its writer
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write whatever the event adds to the screen
    pub fn handle(&mut self, event: &ChatEvent) -> io::Result<()> {
        match event {
            ChatEvent::TurnStarted { .. } => self.reset(),
            ChatEvent::Render(update) => self.render(update)?,
            ChatEvent::TurnFailed { error, .. } => {
                if self.mid_message() {
                    writeln!(self.out)?;
                }
                let line = self.paint(RED, &format!("error: {error}"));
                writeln!(self.out, "{line}")?;
                self.reset();
            }
            ChatEvent::Cleared => {
                if self.mid_message() {
                    writeln!(self.out)?;
                }
                let line = self.paint(DIM, "(conversation cleared)");
                writeln!(self.out, "{line}")?;
                self.reset();
            }
        }
        self.out.flush()
    }

    fn render(&mut self, update: &RenderUpdate) -> io::Result<()> {
        let view = &update.view;

        if let Some(thinking) = view.thinking.as_deref() {
            if !self.thinking_header {
                let header = self.paint(DIM, "[thinking]");
                writeln!(self.out, "{header}")?;
                self.thinking_header = true;
            }
            let (diverged, delta) = advance(&mut self.shown_thinking, thinking);
            if diverged {
                writeln!(self.out)?;
            }
            let delta = self.paint(DIM, delta);
            write!(self.out, "{delta}")?;

            if !view.thinking_open && !self.thinking_closed {
                let footer = self.paint(DIM, "[/thinking]");
                write!(self.out, "\n{footer}\n")?;
                self.thinking_closed = true;
            }
        }

        let (diverged, delta) = advance(&mut self.shown_response, &view.response);
        if diverged {
            writeln!(self.out)?;
        }
        write!(self.out, "{delta}")?;

        if update.phase == TurnPhase::Settled {
            writeln!(self.out)?;
            self.reset();
        }
        Ok(())
    }

    fn mid_message(&self) -> bool {
        !self.shown_response.is_empty() || (self.thinking_header && !self.thinking_closed)
    }

    fn reset(&mut self) {
        self.shown_thinking.clear();
        self.shown_response.clear();
        self.thinking_header = false;
        self.thinking_closed = false;
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color && !text.is_empty() {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Record `current` as shown and return the part not printed yet
///
/// The flag is set when `current` no longer extends what was shown, in which
/// case all of `current` is returned.
fn advance<'a>(shown: &mut String, current: &'a str) -> (bool, &'a str) {
    if let Some(rest) = current.strip_prefix(shown.as_str()) {
        shown.push_str(rest);
        (false, rest)
    } else {
        *shown = current.to_string();
        (true, current)
    }
}
