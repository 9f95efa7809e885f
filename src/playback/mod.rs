//! Playback controller
//!
//! The controller sits between user input and the speech engine. It owns the
//! voice catalog and the playback state, and it is the only place that
//! decides what the play/stop button says. User actions come in through
//! [`PlaybackController::toggle_playback`] and friends; engine notifications
//! come in through [`PlaybackController::handle_event`].
//!
//! At most one utterance is active at a time. A new utterance can only be
//! submitted from `Idle`, and toggling while one is active cancels it without
//! waiting for the engine to confirm.

pub mod config;
pub mod view;

use crate::catalog::{default_voice, CatalogView, Voice, VoiceCatalog};
use crate::engine::{EngineEvent, EventSender, SpeechEngine, UtteranceId, UtteranceRequest};
use crate::error::ValidationError;
use crate::{Result, VoxError};
use log::{debug, error, info, warn};
use view::{ButtonLabel, EngineStatus, PlaybackView};

/// Words per minute that correspond to the engine's normal rate
pub const WPM_PER_ENGINE_RATE: f32 = 175.0;

/// Default speech rate in words per minute
pub const DEFAULT_RATE_WPM: f32 = 175.0;

/// Default volume (0.0-1.0)
pub const DEFAULT_VOLUME: f32 = 1.0;

/// Language prefix of the voice picked when nothing else is selected
pub const DEFAULT_LANGUAGE: &str = "es";

/// Longest text accepted for playback, in characters
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 1000;

/// Convert a words-per-minute rate into the engine's rate multiplier
pub fn engine_rate(wpm: f32) -> f32 {
    wpm / WPM_PER_ENGINE_RATE
}

/// Reject rates that are not a positive number of words per minute
pub fn check_rate(wpm: f32) -> Result<f32> {
    if wpm.is_finite() && wpm > 0.0 {
        Ok(wpm)
    } else {
        Err(VoxError::InvalidSetting(format!(
            "rate must be a positive number, got {}",
            wpm
        )))
    }
}

/// Reject volumes outside 0.0-1.0
pub fn check_volume(volume: f32) -> Result<f32> {
    if (0.0..=1.0).contains(&volume) {
        Ok(volume)
    } else {
        Err(VoxError::InvalidSetting(format!(
            "volume must be between 0.0 and 1.0, got {}",
            volume
        )))
    }
}

/// Settings the controller starts from
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    /// Rate in words per minute
    pub rate: f32,
    /// Volume, 0.0 to 1.0
    pub volume: f32,
    /// Voice to prefer over the language default when the catalog has it
    pub voice: Option<String>,
    /// Language prefix for the default voice
    pub language: String,
    /// Longest accepted text, in characters
    pub max_text_length: usize,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE_WPM,
            volume: DEFAULT_VOLUME,
            voice: None,
            language: DEFAULT_LANGUAGE.to_string(),
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
        }
    }
}

/// Where the active utterance is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing submitted
    Idle,
    /// Submitted, engine has not reported the start yet
    Pending(UtteranceId),
    /// Engine reported the start
    Speaking(UtteranceId),
}

/// Mutable playback state
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    phase: Phase,
    selected_voice: Option<String>,
    rate: f32,
    volume: f32,
}

impl PlaybackState {
    fn new(settings: &PlaybackSettings) -> Self {
        Self {
            phase: Phase::Idle,
            selected_voice: None,
            rate: settings.rate,
            volume: settings.volume,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True once the engine has confirmed the utterance started
    pub fn is_speaking(&self) -> bool {
        matches!(self.phase, Phase::Speaking(_))
    }

    /// True while an utterance is submitted or playing
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn active_utterance(&self) -> Option<UtteranceId> {
        match self.phase {
            Phase::Idle => None,
            Phase::Pending(id) | Phase::Speaking(id) => Some(id),
        }
    }

    pub fn selected_voice(&self) -> Option<&str> {
        self.selected_voice.as_deref()
    }

    /// Rate in words per minute
    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

/// What a call to [`PlaybackController::toggle_playback`] did
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// A new utterance was handed to the engine
    Submitted(UtteranceId),
    /// The active utterance was cancelled
    Cancelled,
    /// Input was rejected before reaching the engine
    Rejected(ValidationError),
    /// The engine refused the utterance; state is back to idle
    EngineFailed,
}

/// Mediates between user input and the speech engine
pub struct PlaybackController {
    engine: Box<dyn SpeechEngine>,
    view: Box<dyn PlaybackView>,
    events: EventSender,
    catalog: VoiceCatalog,
    state: PlaybackState,
    settings: PlaybackSettings,
    disabled: bool,
    next_utterance: u64,
}

impl PlaybackController {
    /// Create a controller; nothing touches the engine until [`initialize`](Self::initialize)
    pub fn new(
        engine: Box<dyn SpeechEngine>,
        view: Box<dyn PlaybackView>,
        events: EventSender,
        settings: PlaybackSettings,
    ) -> Self {
        let state = PlaybackState::new(&settings);
        Self {
            engine,
            view,
            events,
            catalog: VoiceCatalog::default(),
            state,
            settings,
            disabled: false,
            next_utterance: 0,
        }
    }

    /// Check engine support, load voices and subscribe to catalog changes
    ///
    /// Without engine support the controller disables itself for good and
    /// returns [`VoxError::Unsupported`].
    pub fn initialize(&mut self) -> Result<()> {
        if !self.engine.is_supported() {
            warn!("Speech synthesis not supported, disabling controls");
            self.disabled = true;
            self.view.show_status(EngineStatus::Unsupported);
            self.view.disable_controls();
            return Err(VoxError::Unsupported);
        }

        self.view.show_status(EngineStatus::Available);

        let voices = self.engine.list_voices().unwrap_or_else(|e| {
            error!("Failed to list voices: {}", e);
            Vec::new()
        });
        self.refresh_catalog(voices);

        if let Err(e) = self.engine.on_voices_changed(self.events.clone()) {
            warn!("Voice change notifications unavailable: {}", e);
        }

        self.view.set_button(ButtonLabel::Play);
        info!("Playback controller ready with {} voices", self.catalog.len());
        Ok(())
    }

    /// Replace the voice catalog and pick the default selection
    ///
    /// Running this again with the same voices yields the same view.
    pub fn refresh_catalog(&mut self, voices: Vec<Voice>) {
        self.catalog.replace(voices);

        self.state.selected_voice = if self.catalog.is_empty() {
            None
        } else {
            let preferred = self
                .settings
                .voice
                .as_deref()
                .and_then(|name| self.catalog.find(name));
            preferred
                .or_else(|| default_voice(self.catalog.voices(), &self.settings.language))
                .map(|v| v.name.clone())
        };

        debug!(
            "Catalog refreshed: {} voices, selected {:?}",
            self.catalog.len(),
            self.state.selected_voice
        );
        self.present_catalog();
    }

    /// Redraw the voice selector
    pub fn present_catalog(&mut self) {
        self.view
            .show_catalog(self.catalog.view(), self.state.selected_voice.as_deref());
    }

    /// Start speaking `text`, or stop if something is already playing
    ///
    /// Text is validated first; invalid text only raises an alert.
    /// `voice_name` that matches no catalog voice leaves the engine default in
    /// place. `rate` is in words per minute, `volume` is passed through.
    pub fn toggle_playback(
        &mut self,
        text: &str,
        voice_name: Option<&str>,
        rate: f32,
        volume: f32,
    ) -> Result<ToggleOutcome> {
        self.ensure_enabled()?;

        let text = text.trim();
        if let Err(err) = self.validate(text) {
            self.view.alert(&err.to_string());
            return Ok(ToggleOutcome::Rejected(err));
        }

        if self.state.is_active() {
            self.cancel_active();
            return Ok(ToggleOutcome::Cancelled);
        }

        let voice = voice_name.and_then(|name| self.catalog.find(name)).cloned();
        if voice.is_none() {
            debug!("No catalog voice matches {:?}, using engine default", voice_name);
        }

        self.next_utterance += 1;
        let id = UtteranceId(self.next_utterance);
        let request = UtteranceRequest {
            id,
            text: text.to_string(),
            voice,
            rate: engine_rate(rate),
            volume,
        };

        debug!("Submitting utterance {}", id);
        self.state.phase = Phase::Pending(id);
        match self.engine.speak(request, self.events.clone()) {
            Ok(()) => Ok(ToggleOutcome::Submitted(id)),
            Err(e) => {
                self.handle_event(EngineEvent::Failed {
                    utterance: id,
                    message: e.to_string(),
                });
                Ok(ToggleOutcome::EngineFailed)
            }
        }
    }

    /// Toggle using the controller's own voice, rate and volume
    pub fn toggle(&mut self, text: &str) -> Result<ToggleOutcome> {
        let voice = self.state.selected_voice.clone();
        let (rate, volume) = (self.state.rate, self.state.volume);
        self.toggle_playback(text, voice.as_deref(), rate, volume)
    }

    /// Cancel the active utterance, if any; returns whether one was active
    pub fn stop(&mut self) -> Result<bool> {
        self.ensure_enabled()?;
        if !self.state.is_active() {
            return Ok(false);
        }
        self.cancel_active();
        Ok(true)
    }

    /// Apply one engine notification
    pub fn handle_event(&mut self, event: EngineEvent) {
        if self.disabled {
            return;
        }

        let active = self.state.active_utterance();
        match event {
            EngineEvent::Started(id) if active == Some(id) => {
                debug!("Utterance {} started", id);
                self.state.phase = Phase::Speaking(id);
                self.view.set_button(ButtonLabel::Stop);
            }
            EngineEvent::Ended(id) if active == Some(id) => {
                debug!("Utterance {} ended", id);
                self.reset_to_idle();
            }
            EngineEvent::Failed { utterance, message } if active == Some(utterance) => {
                error!("Speech synthesis error on {}: {}", utterance, message);
                self.reset_to_idle();
            }
            EngineEvent::VoicesChanged => match self.engine.list_voices() {
                Ok(voices) => self.refresh_catalog(voices),
                Err(e) => error!("Failed to reload voices: {}", e),
            },
            stale => debug!("Ignoring event for inactive utterance: {:?}", stale),
        }
    }

    /// Select a catalog voice by name
    pub fn select_voice(&mut self, name: &str) -> Result<()> {
        self.ensure_enabled()?;
        let voice = self
            .catalog
            .find(name)
            .ok_or_else(|| VoxError::UnknownVoice(name.to_string()))?;
        self.state.selected_voice = Some(voice.name.clone());
        Ok(())
    }

    /// Set the rate in words per minute
    pub fn set_rate(&mut self, wpm: f32) -> Result<()> {
        self.ensure_enabled()?;
        self.state.rate = check_rate(wpm)?;
        Ok(())
    }

    /// Set the volume (0.0-1.0)
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.ensure_enabled()?;
        self.state.volume = check_volume(volume)?;
        Ok(())
    }

    /// Let the engine do periodic work
    pub fn tick(&mut self) {
        if !self.disabled {
            self.engine.poll();
        }
    }

    /// Stop anything still playing before the controller goes away
    pub fn shutdown(&mut self) {
        if !self.disabled && self.state.is_active() {
            self.cancel_active();
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    /// Grouped view of the current catalog
    pub fn catalog_view(&self) -> &CatalogView {
        self.catalog.view()
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn button_label(&self) -> ButtonLabel {
        if self.state.is_speaking() {
            ButtonLabel::Stop
        } else {
            ButtonLabel::Play
        }
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.disabled {
            Err(VoxError::Unsupported)
        } else {
            Ok(())
        }
    }

    fn validate(&self, text: &str) -> std::result::Result<(), ValidationError> {
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let len = text.chars().count();
        if len > self.settings.max_text_length {
            return Err(ValidationError::TextTooLong {
                len,
                max: self.settings.max_text_length,
            });
        }
        Ok(())
    }

    /// Cancel without waiting for the engine's acknowledgement
    fn cancel_active(&mut self) {
        debug!("Cancelling utterance {:?}", self.state.active_utterance());
        if let Err(e) = self.engine.cancel_current() {
            warn!("Cancel failed: {}", e);
        }
        self.reset_to_idle();
    }

    fn reset_to_idle(&mut self) {
        self.state.phase = Phase::Idle;
        self.view.set_button(ButtonLabel::Play);
    }
}
