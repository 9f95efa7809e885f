//! Error types for voxplay

use std::io;
use thiserror::Error;

/// Input rejected before anything reaches the speech engine
///
/// These are recovered locally: the user sees an alert and nothing else changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter some text to play")]
    EmptyText,

    #[error("Text is too long ({len} characters, maximum is {max})")]
    TextTooLong { len: usize, max: usize },
}

/// Main error type for voxplay
#[derive(Error, Debug)]
pub enum VoxError {
    #[error("Speech synthesis not supported")]
    Unsupported,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Speech engine error: {0}")]
    Engine(String),

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("Invalid command: {0}")]
    Command(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for voxplay operations
pub type Result<T> = std::result::Result<T, VoxError>;
