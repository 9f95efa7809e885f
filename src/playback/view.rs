//! Presentation seam between the controller and whatever draws the controls

use crate::catalog::CatalogView;
use std::fmt;

/// Text on the play/stop button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonLabel {
    Play,
    Stop,
}

impl fmt::Display for ButtonLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonLabel::Play => write!(f, "Play"),
            ButtonLabel::Stop => write!(f, "Stop"),
        }
    }
}

/// Availability of speech synthesis, shown once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Available,
    Unsupported,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Available => write!(f, "Speech synthesis available"),
            EngineStatus::Unsupported => write!(f, "Speech synthesis not supported"),
        }
    }
}

/// Everything the controller asks of the user interface
pub trait PlaybackView {
    /// Show whether speech synthesis is available
    fn show_status(&mut self, status: EngineStatus);

    /// Permanently disable the input controls
    fn disable_controls(&mut self);

    /// Redraw the voice selector
    fn show_catalog(&mut self, view: &CatalogView, selected: Option<&str>);

    /// Update the play/stop button
    fn set_button(&mut self, label: ButtonLabel);

    /// Show a message the user has to acknowledge
    fn alert(&mut self, message: &str);
}
