//! Interactive Input
//!
//! Lines starting with `/` are commands; everything else is a message.

/// One line of user input
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    /// Send a chat message
    Message(String),
    /// Empty the conversation
    Clear,
    /// List models
    Models,
    /// Select a model
    Model(String),
    /// Check backend liveness
    Health,
    /// Show help
    Help,
    /// Leave the session
    Quit,
    /// Unrecognised command
    Unknown(String),
}

/// Help text for the interactive session
pub const HELP: &str = "\
Commands:
  /clear          empty the conversation
  /models         list available models
  /model <name>   switch model
  /health         check the backend
  /help           show this help
  /quit           exit (also Ctrl-C or Ctrl-D at the prompt)
Ctrl-C while a response is streaming abandons it and clears the conversation.";

/// Parse a line of input
pub fn parse(line: &str) -> Input {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Message(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match (name, arg) {
        ("clear", _) => Input::Clear,
        ("models", _) => Input::Models,
        ("model", "") => Input::Unknown("/model needs a model name".to_string()),
        ("model", model) => Input::Model(model.to_string()),
        ("health", _) => Input::Health,
        ("help" | "?", _) => Input::Help,
        ("quit" | "exit" | "q", _) => Input::Quit,
        _ => Input::Unknown(format!("unknown command /{name}")),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_messages_pass_through() {
        assert_eq!(parse("hello there"), Input::Message("hello there".to_string()));
        assert_eq!(parse("   "), Input::Message("   ".to_string()));
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse("/clear"), Input::Clear);
        assert_eq!(parse("  /models  "), Input::Models);
        assert_eq!(parse("/model qwen3:1.7b"), Input::Model("qwen3:1.7b".to_string()));
        assert_eq!(parse("/health"), Input::Health);
        assert_eq!(parse("/?"), Input::Help);
        assert_eq!(parse("/exit"), Input::Quit);
    }

    #[test]
    fn test_help_lists_every_way_out() {
        assert!(HELP.contains("/quit"));
        assert!(HELP.contains("Ctrl-C or Ctrl-D at the prompt"));
        assert!(HELP.contains("abandons it"));
    }

    #[test]
    fn test_bad_commands() {
        assert!(matches!(parse("/model"), Input::Unknown(_)));
        assert!(matches!(parse("/frobnicate"), Input::Unknown(ref m) if m.contains("frobnicate")));
    }
}
