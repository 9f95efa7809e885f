//! Interactive commands
//!
//! Each line typed at the prompt maps to one [`Command`]. The commands stand
//! in for the form controls: text box, voice selector, rate and volume
//! sliders and the play/stop button.

use crate::{Result, VoxError};

/// Help shown by the `help` command
pub const HELP: &str = "\
Commands:
  play [text]    speak the current text (or the given text); stops if playing
  stop           stop speaking
  text <text>    set the text to speak
  voices         list voices grouped by language
  voice <name>   select a voice
  rate <wpm>     set the rate in words per minute
  volume <0-1>   set the volume
  status         show the current settings
  save           store rate, volume and voice in the config file
  help           show this help
  quit           exit";

/// A parsed interactive command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play(Option<String>),
    Stop,
    Text(String),
    Voices,
    Voice(String),
    Rate(f32),
    Volume(f32),
    Status,
    Save,
    Help,
    Quit,
}

/// Parse one input line
///
/// Blank lines give `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "play" | "say" | "p" => Command::Play(non_empty(rest)),
        "stop" | "s" => Command::Stop,
        "text" | "t" => Command::Text(rest.to_string()),
        "voices" | "v" => Command::Voices,
        "voice" => Command::Voice(required(word, rest)?),
        "rate" | "r" => Command::Rate(number(word, rest)?),
        "volume" | "vol" => Command::Volume(number(word, rest)?),
        "status" => Command::Status,
        "save" => Command::Save,
        "help" | "h" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => {
            return Err(VoxError::Command(format!(
                "unknown command '{}' (type 'help' for a list)",
                other
            )))
        }
    };

    Ok(Some(command))
}

fn non_empty(rest: &str) -> Option<String> {
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn required(word: &str, rest: &str) -> Result<String> {
    non_empty(rest).ok_or_else(|| VoxError::Command(format!("'{}' needs an argument", word)))
}

fn number(word: &str, rest: &str) -> Result<f32> {
    let arg = required(word, rest)?;
    arg.parse()
        .map_err(|_| VoxError::Command(format!("'{}' expects a number, got '{}'", word, arg)))
}
