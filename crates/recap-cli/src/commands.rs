//! Slash commands for interactive mode

use recap_agent::{ConversationState, Router};

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Show a message to the user (not sent to the executor)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command.
///
/// Returns `None` when the input is a chat message rather than a command.
pub fn execute_command(
    input: &str,
    chat_id: &str,
    state: Option<&ConversationState>,
    router: &Router,
) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let command = rest.split_whitespace().next().unwrap_or("").to_lowercase();

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),
        "quit" | "exit" | "q" => CommandResult::Exit,
        "state" | "s" => CommandResult::Message(describe_state(chat_id, state, router)),
        _ => CommandResult::Unknown(command),
    })
}

/// One-paragraph view of the counters for `/state`
pub fn describe_state(chat_id: &str, state: Option<&ConversationState>, router: &Router) -> String {
    let threshold = router.threshold().get();
    match state {
        None => format!(
            "chat {}: no turns yet (compression every {} turns)",
            chat_id, threshold
        ),
        Some(state) => {
            let summary = if state.has_summary() {
                format!("{} chars", state.summary_context.len())
            } else {
                "none".to_string()
            };
            format!(
                "chat {}: {} messages, step {} of {}, summary: {}",
                state.chat_id,
                state.messages.len(),
                state.step_count,
                threshold,
                summary
            )
        }
    }
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /state, /s           Show message count, turn counter and summary size
  /quit, /exit, /q     Exit recap

Press Ctrl-C while a reply is pending to cancel that turn.
Press Ctrl-C or Ctrl-D at an empty prompt to exit."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_ai::ChatMessage;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert!(execute_command("hello", "c", None, &Router::default()).is_none());
    }

    #[test]
    fn test_exit_aliases() {
        for input in ["/exit", "/quit", "/q", "  /EXIT  "] {
            assert_eq!(
                execute_command(input, "c", None, &Router::default()),
                Some(CommandResult::Exit),
                "{}",
                input
            );
        }
    }

    #[test]
    fn test_help_explains_cancel_and_exit() {
        let Some(CommandResult::Message(help)) =
            execute_command("/help", "c", None, &Router::default())
        else {
            panic!("expected help text");
        };
        assert!(help.contains("cancel that turn"));
        assert!(help.contains("Ctrl-D"));
        assert!(help.contains("/exit"));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            execute_command("/branch 3", "c", None, &Router::default()),
            Some(CommandResult::Unknown("branch".into()))
        );
    }

    #[test]
    fn test_state_before_first_turn() {
        let text = describe_state("abc", None, &Router::default());
        assert!(text.contains("no turns yet"));
        assert!(text.contains("every 5 turns"));
    }

    #[test]
    fn test_state_reports_counters() {
        let mut state = ConversationState::new("abc");
        state.messages.push(ChatMessage::user("hi"));
        state.messages.push(ChatMessage::assistant("hello"));
        state.step_count = 2;
        state.summary_context = "user said hi".into();

        let text = describe_state("abc", Some(&state), &Router::default());
        assert_eq!(text, "chat abc: 2 messages, step 2 of 5, summary: 12 chars");
    }
}
