//! Line-oriented front end: one command per stdin line.

use crate::error::CommandError;
use crate::screen::ScreenEvent;
use crate::session::{SessionCommand, SessionHandle};

pub const HELP: &str = "\
commands:
  next | accept | decline     walk through onboarding
  start | stop                begin or end monitoring
  stats | chat | back         open or close an overlay
  report                      request a coaching report
  analyze                     ask the coach to analyze the current state
  say <message>               send a chat message
  new                         start a new conversation
  detect on|off               toggle server-side detection
  status                      print the session state
  quit                        exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Screen(ScreenEvent),
    Report,
    Analyze,
    Say(String),
    NewChat,
    Detect(bool),
    Status,
    Help,
    Quit,
}

impl Input {
    /// The session command this input maps to. `None` for inputs the front
    /// end answers itself.
    pub fn into_command(self) -> Option<SessionCommand> {
        match self {
            Input::Screen(event) => Some(SessionCommand::Screen(event)),
            Input::Report => Some(SessionCommand::RequestReport),
            Input::Analyze => Some(SessionCommand::Analyze),
            Input::Say(message) => Some(SessionCommand::SendChat(message)),
            Input::NewChat => Some(SessionCommand::ClearChat),
            Input::Detect(enabled) => Some(SessionCommand::SetDetection(enabled)),
            Input::Quit => Some(SessionCommand::Shutdown),
            Input::Status | Input::Help => None,
        }
    }
}

/// Parses one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Input>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let input = match word.to_ascii_lowercase().as_str() {
        "next" | "advance" => Input::Screen(ScreenEvent::Advance),
        "accept" => Input::Screen(ScreenEvent::Accept),
        "decline" => Input::Screen(ScreenEvent::Decline),
        "start" => Input::Screen(ScreenEvent::Start),
        "stop" => Input::Screen(ScreenEvent::Stop),
        "stats" => Input::Screen(ScreenEvent::OpenStats),
        "chat" => Input::Screen(ScreenEvent::OpenChat),
        "back" => Input::Screen(ScreenEvent::Back),
        "report" => Input::Report,
        "analyze" => Input::Analyze,
        "say" => Input::Say(rest.to_string()),
        "new" => Input::NewChat,
        "detect" => match rest.to_ascii_lowercase().as_str() {
            "on" => Input::Detect(true),
            "off" => Input::Detect(false),
            _ => return Err(CommandError::Usage("detect on|off")),
        },
        "status" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(input))
}

/// Forwards a parsed input to the session. Returns `false` once the input
/// asked to quit.
pub fn dispatch(handle: &SessionHandle, input: Input) -> anyhow::Result<bool> {
    let quit = input == Input::Quit;
    if let Some(command) = input.into_command() {
        handle.send(command)?;
    }
    Ok(!quit)
}
