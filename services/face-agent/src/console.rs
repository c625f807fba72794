//! Line-oriented debug console read from stdin.

use pixelface_core::OverlayKind;
use pixelface_types::{EmotionState, ParseEmotionError};

pub const HELP: &str = "commands: emotion <STATE> | hold <STATE> | release | mute | connect | disconnect | \
dismiss <map|check_in> | demo | status | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// One-shot emotion write, overwritten by the next live signal.
    Emotion(EmotionState),
    /// Pin the face until `release`.
    Hold(EmotionState),
    Release,
    ToggleMute,
    Connect,
    Disconnect,
    Dismiss(OverlayKind),
    /// Start the demo loop, or stop it if it is running.
    ToggleDemo,
    Status,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConsoleError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0} needs an argument")]
    MissingArgument(&'static str),
    #[error(transparent)]
    Emotion(#[from] ParseEmotionError),
    #[error("unknown overlay: {0} (expected map or check_in)")]
    Overlay(String),
}

/// Parses one console line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match verb.to_ascii_lowercase().as_str() {
        "emotion" | "set" => ConsoleCommand::Emotion(emotion_arg("emotion", arg)?),
        "hold" | "pin" => ConsoleCommand::Hold(emotion_arg("hold", arg)?),
        "release" | "unpin" => ConsoleCommand::Release,
        "mute" => ConsoleCommand::ToggleMute,
        "connect" => ConsoleCommand::Connect,
        "disconnect" => ConsoleCommand::Disconnect,
        "dismiss" | "close" => {
            let target = arg.ok_or(ConsoleError::MissingArgument("dismiss"))?;
            match target.to_ascii_lowercase().as_str() {
                "map" => ConsoleCommand::Dismiss(OverlayKind::Map),
                "check_in" | "checkin" => ConsoleCommand::Dismiss(OverlayKind::CheckIn),
                _ => return Err(ConsoleError::Overlay(target.to_string())),
            }
        }
        "demo" => ConsoleCommand::ToggleDemo,
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => return Err(ConsoleError::Unknown(verb.to_string())),
    };
    Ok(Some(command))
}

/// Case-insensitive emotion name, for the console and the command line.
pub fn parse_emotion(raw: &str) -> Result<EmotionState, ParseEmotionError> {
    raw.to_ascii_uppercase().parse()
}

fn emotion_arg(verb: &'static str, arg: Option<&str>) -> Result<EmotionState, ConsoleError> {
    let raw = arg.ok_or(ConsoleError::MissingArgument(verb))?;
    Ok(parse_emotion(raw)?)
}
