//! Engine used when no speech backend could be created

use crate::catalog::Voice;
use crate::engine::{EventSender, SpeechEngine, UtteranceRequest};
use crate::{Result, VoxError};

/// Reports speech synthesis as unsupported and refuses every request
#[derive(Debug, Clone)]
pub struct UnavailableEngine {
    reason: String,
}

impl UnavailableEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the platform backend could not be created
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl SpeechEngine for UnavailableEngine {
    fn is_supported(&self) -> bool {
        false
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        Err(VoxError::Unsupported)
    }

    fn on_voices_changed(&mut self, _events: EventSender) -> Result<()> {
        Err(VoxError::Unsupported)
    }

    fn speak(&mut self, _request: UtteranceRequest, _events: EventSender) -> Result<()> {
        Err(VoxError::Unsupported)
    }

    fn cancel_current(&mut self) -> Result<()> {
        Err(VoxError::Unsupported)
    }
}
