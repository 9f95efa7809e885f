//! Native speech engine using the tts crate
//!
//! The `tts` crate provides a unified interface to:
//! - Speech Dispatcher on Linux (via native bindings)
//! - AVFoundation on macOS/iOS
//! - WinRT / SAPI on Windows
//!
//! Backends that support utterance callbacks report start/end directly.
//! The others are polled with `is_speaking()` from [`SpeechEngine::poll`].

use crate::catalog::Voice;
use crate::engine::{EngineEvent, EventSender, SpeechEngine, UtteranceId, UtteranceRequest};
use crate::{Result, ValidationError, VoxError};
use log::{debug, error, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tts::Tts as TtsCrate;

/// Rate multiplier that maps onto the backend's maximum rate
pub const MAX_RATE_MULTIPLIER: f32 = 2.0;

/// How often the voice list is re-read to detect changes
const VOICE_REFRESH_INTERVAL: Duration = Duration::from_secs(2);

/// Time after `speak` before `is_speaking() == false` counts as finished
const SPEAKING_GRACE: Duration = Duration::from_millis(300);

/// Retired backend handles remembered for late callbacks
const MAX_RETIRED: usize = 16;

/// Backend-assigned utterance handle
///
/// `tts::UtteranceId` is only `Debug` on every platform (AVFoundation wraps a
/// raw object pointer), so handles are compared by their debug form.
#[derive(Clone, Debug, PartialEq, Eq)]
struct BackendId(String);

impl From<&tts::UtteranceId> for BackendId {
    fn from(id: &tts::UtteranceId) -> Self {
        BackendId(format!("{:?}", id))
    }
}

/// Utterance currently owned by the backend, shared with its callbacks
///
/// Callbacks report the backend handle they belong to. Handles of cancelled
/// or finished utterances are retired so their late callbacks are dropped
/// instead of being blamed on whatever utterance is current.
#[derive(Default)]
struct InFlight {
    utterance: Option<UtteranceId>,
    backend: Option<BackendId>,
    events: Option<EventSender>,
    retired: VecDeque<BackendId>,
}

impl InFlight {
    /// Take ownership of a new utterance before it reaches the backend
    fn start(&mut self, utterance: UtteranceId, events: EventSender) {
        self.retire();
        self.utterance = Some(utterance);
        self.events = Some(events);
    }

    /// Record the handle the backend gave the utterance
    fn submitted(&mut self, backend: Option<BackendId>) {
        let Some(backend) = backend else {
            return;
        };
        if self.utterance.is_some() && !self.retired.contains(&backend) {
            self.backend = Some(backend);
        } else if !self.retired.contains(&backend) {
            // Finished before `speak` returned
            self.push_retired(backend);
        }
    }

    /// Forget the utterance, returning who to tell about it
    fn finish(&mut self) -> Option<(UtteranceId, EventSender)> {
        self.retire();
        let id = self.utterance.take()?;
        let events = self.events.take()?;
        Some((id, events))
    }

    /// Drop the utterance without telling anyone
    fn clear(&mut self) {
        self.retire();
        self.utterance = None;
        self.events = None;
    }

    /// Begin callback for `backend`
    fn began(&mut self, backend: &BackendId) -> Option<(UtteranceId, EventSender)> {
        if !self.owns(backend, false) {
            return None;
        }
        let id = self.utterance?;
        let events = self.events.clone()?;
        Some((id, events))
    }

    /// End or stop callback for `backend`
    fn ended(&mut self, backend: &BackendId) -> Option<(UtteranceId, EventSender)> {
        if !self.owns(backend, true) {
            return None;
        }
        // Its last callback, nothing left to filter
        self.backend = None;
        self.finish()
    }

    /// Whether a callback for `backend` belongs to the current utterance
    fn owns(&mut self, backend: &BackendId, last: bool) -> bool {
        if let Some(pos) = self.retired.iter().position(|r| r == backend) {
            if last {
                self.retired.remove(pos);
            }
            debug!("Ignoring late callback for {:?}", backend);
            return false;
        }

        match &self.backend {
            Some(current) => current == backend,
            // `speak` has not returned yet; older handles are all known
            None => self.utterance.is_some(),
        }
    }

    fn retire(&mut self) {
        if let Some(backend) = self.backend.take() {
            self.push_retired(backend);
        }
    }

    fn push_retired(&mut self, backend: BackendId) {
        if self.retired.len() == MAX_RETIRED {
            self.retired.pop_front();
        }
        self.retired.push_back(backend);
    }
}

/// Native engine backed by the platform's speech service
pub struct NativeEngine {
    /// The tts crate's TTS instance
    tts: TtsCrate,

    /// Voice the backend started with, restored when no voice is forced
    default_voice: Option<tts::Voice>,

    /// In-flight utterance, also seen by backend callbacks
    in_flight: Arc<Mutex<InFlight>>,

    /// When the current utterance was handed to the backend (polled mode only)
    spoken_at: Option<Instant>,

    /// Listener for voice list changes
    voices_listener: Option<EventSender>,

    /// Voices seen at the last check
    last_voices: Vec<Voice>,

    last_voice_check: Instant,
}

impl NativeEngine {
    /// Create a new native engine
    ///
    /// Fails when the platform backend cannot be initialized.
    pub fn new() -> Result<Self> {
        debug!("Creating native TTS backend");

        let tts = TtsCrate::default()
            .map_err(|e| VoxError::Engine(format!("Failed to initialize TTS: {}", e)))?;

        let features = tts.supported_features();
        debug!(
            "Backend features: rate={} volume={} voice={} stop={} callbacks={}",
            features.rate, features.volume, features.voice, features.stop, features.utterance_callbacks
        );

        let default_voice = if features.get_voice {
            tts.voice().unwrap_or_else(|e| {
                warn!("Could not read the default voice: {}", e);
                None
            })
        } else {
            None
        };

        let in_flight = Arc::new(Mutex::new(InFlight::default()));
        if features.utterance_callbacks {
            Self::register_callbacks(&tts, &in_flight)?;
        } else {
            debug!("Utterance callbacks not supported, falling back to polling");
        }

        Ok(Self {
            tts,
            default_voice,
            in_flight,
            spoken_at: None,
            voices_listener: None,
            last_voices: Vec::new(),
            last_voice_check: Instant::now(),
        })
    }

    fn register_callbacks(tts: &TtsCrate, in_flight: &Arc<Mutex<InFlight>>) -> Result<()> {
        let begin = Arc::clone(in_flight);
        tts.on_utterance_begin(Some(Box::new(move |backend: tts::UtteranceId| {
            let backend = BackendId::from(&backend);
            let current = begin.lock().ok().and_then(|mut state| state.began(&backend));
            if let Some((id, events)) = current {
                events.send(EngineEvent::Started(id));
            }
        })))
        .map_err(|e| VoxError::Engine(format!("Failed to register begin callback: {}", e)))?;

        let end = Arc::clone(in_flight);
        tts.on_utterance_end(Some(Box::new(move |backend: tts::UtteranceId| {
            let backend = BackendId::from(&backend);
            let finished = end.lock().ok().and_then(|mut state| state.ended(&backend));
            if let Some((id, events)) = finished {
                events.send(EngineEvent::Ended(id));
            }
        })))
        .map_err(|e| VoxError::Engine(format!("Failed to register end callback: {}", e)))?;

        let stop = Arc::clone(in_flight);
        tts.on_utterance_stop(Some(Box::new(move |backend: tts::UtteranceId| {
            let backend = BackendId::from(&backend);
            let finished = stop.lock().ok().and_then(|mut state| state.ended(&backend));
            if let Some((id, events)) = finished {
                events.send(EngineEvent::Ended(id));
            }
        })))
        .map_err(|e| VoxError::Engine(format!("Failed to register stop callback: {}", e)))?;

        Ok(())
    }

    fn with_in_flight<T>(&self, f: impl FnOnce(&mut InFlight) -> T) -> Option<T> {
        match self.in_flight.lock() {
            Ok(mut state) => Some(f(&mut state)),
            Err(e) => {
                error!("In-flight utterance state poisoned: {}", e);
                None
            }
        }
    }

    fn take_in_flight(&self) -> Option<(UtteranceId, EventSender)> {
        self.with_in_flight(InFlight::finish).flatten()
    }

    fn apply_voice(&mut self, voice: Option<&Voice>) -> Result<()> {
        if !self.tts.supported_features().voice {
            if voice.is_some() {
                warn!("Voice selection not supported on this platform");
            }
            return Ok(());
        }

        let target = match voice {
            Some(wanted) => {
                let voices = self
                    .tts
                    .voices()
                    .map_err(|e| VoxError::Engine(format!("Failed to get voices: {}", e)))?;
                let found = voices.into_iter().find(|v| v.name() == wanted.name);
                if found.is_none() {
                    warn!("Voice {:?} disappeared from the backend", wanted.name);
                }
                found
            }
            None => self.default_voice.clone(),
        };

        if let Some(target) = target {
            debug!("Selecting voice: {}", target.name());
            self.tts
                .set_voice(&target)
                .map_err(|e| VoxError::Engine(format!("Failed to set voice: {}", e)))?;
        }

        Ok(())
    }

    fn apply_rate(&mut self, multiplier: f32) -> Result<()> {
        if !self.tts.supported_features().rate {
            warn!("Rate control not supported on this platform");
            return Ok(());
        }

        let rate = scale_rate(
            multiplier,
            self.tts.min_rate(),
            self.tts.normal_rate(),
            self.tts.max_rate(),
        );
        debug!("Setting backend rate to {} (multiplier {})", rate, multiplier);
        self.tts
            .set_rate(rate)
            .map_err(|e| VoxError::Engine(format!("Failed to set rate: {}", e)))?;
        Ok(())
    }

    fn apply_volume(&mut self, volume: f32) -> Result<()> {
        if !self.tts.supported_features().volume {
            warn!("Volume control not supported on this platform");
            return Ok(());
        }

        let scaled = scale_volume(volume, self.tts.min_volume(), self.tts.max_volume());
        debug!("Setting backend volume to {}", scaled);
        self.tts
            .set_volume(scaled)
            .map_err(|e| VoxError::Engine(format!("Failed to set volume: {}", e)))?;
        Ok(())
    }

    fn poll_speaking(&mut self) {
        let Some(spoken_at) = self.spoken_at else {
            return;
        };
        if spoken_at.elapsed() < SPEAKING_GRACE {
            return;
        }

        if !self.tts.supported_features().is_speaking {
            // No way to tell when playback finishes; release the controller.
            self.spoken_at = None;
            if let Some((id, events)) = self.take_in_flight() {
                events.send(EngineEvent::Ended(id));
            }
            return;
        }

        match self.tts.is_speaking() {
            Ok(true) => {}
            Ok(false) => {
                self.spoken_at = None;
                if let Some((id, events)) = self.take_in_flight() {
                    events.send(EngineEvent::Ended(id));
                }
            }
            Err(e) => {
                self.spoken_at = None;
                if let Some((id, events)) = self.take_in_flight() {
                    events.send(EngineEvent::Failed {
                        utterance: id,
                        message: format!("Failed to query speaking state: {}", e),
                    });
                }
            }
        }
    }

    fn poll_voices(&mut self) {
        let Some(listener) = self.voices_listener.clone() else {
            return;
        };
        if self.last_voice_check.elapsed() < VOICE_REFRESH_INTERVAL {
            return;
        }
        self.last_voice_check = Instant::now();

        match self.list_voices() {
            Ok(voices) if voices != self.last_voices => {
                debug!(
                    "Voice list changed ({} -> {} voices)",
                    self.last_voices.len(),
                    voices.len()
                );
                self.last_voices = voices;
                listener.send(EngineEvent::VoicesChanged);
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to refresh voices: {}", e),
        }
    }
}

impl SpeechEngine for NativeEngine {
    fn is_supported(&self) -> bool {
        true
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        let voices = self
            .tts
            .voices()
            .map_err(|e| VoxError::Engine(format!("Failed to get voices: {}", e)))?;

        Ok(voices
            .into_iter()
            .map(|v| Voice::new(v.name(), v.language().to_string()))
            .collect())
    }

    fn on_voices_changed(&mut self, events: EventSender) -> Result<()> {
        self.last_voices = self.list_voices().unwrap_or_default();
        self.last_voice_check = Instant::now();
        self.voices_listener = Some(events);
        Ok(())
    }

    fn speak(&mut self, request: UtteranceRequest, events: EventSender) -> Result<()> {
        if request.text.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }

        self.apply_voice(request.voice.as_ref())?;
        self.apply_rate(request.rate)?;
        self.apply_volume(request.volume)?;

        let callbacks = self.tts.supported_features().utterance_callbacks;
        self.with_in_flight(|state| state.start(request.id, events.clone()));

        debug!("Speaking {}: {}", request.id, request.text);
        match self.tts.speak(request.text, false) {
            Ok(backend) => {
                let backend = backend.as_ref().map(BackendId::from);
                self.with_in_flight(|state| state.submitted(backend));
            }
            Err(e) => {
                self.with_in_flight(InFlight::clear);
                return Err(VoxError::Engine(format!("Speak failed: {}", e)));
            }
        }

        if !callbacks {
            self.spoken_at = Some(Instant::now());
            events.send(EngineEvent::Started(request.id));
        }

        Ok(())
    }

    fn cancel_current(&mut self) -> Result<()> {
        debug!("Canceling speech");
        self.with_in_flight(InFlight::clear);
        self.spoken_at = None;

        if !self.tts.supported_features().stop {
            warn!("Stopping speech not supported on this platform");
            return Ok(());
        }

        self.tts
            .stop()
            .map_err(|e| VoxError::Engine(format!("Cancel failed: {}", e)))?;
        Ok(())
    }

    fn poll(&mut self) {
        self.poll_speaking();
        self.poll_voices();
    }
}

/// Map a rate multiplier onto a backend rate range
///
/// 1.0 is the backend's normal rate, 0.0 its minimum and
/// [`MAX_RATE_MULTIPLIER`] or more its maximum. Backends disagree on scale
/// (Speech Dispatcher is -100..100 around 0, AVFoundation is 0.1..2.0) so
/// the two halves are interpolated separately.
pub fn scale_rate(multiplier: f32, min: f32, normal: f32, max: f32) -> f32 {
    let multiplier = if multiplier.is_finite() {
        multiplier.max(0.0)
    } else {
        1.0
    };

    if multiplier <= 1.0 {
        min + (normal - min) * multiplier
    } else {
        let above = ((multiplier - 1.0) / (MAX_RATE_MULTIPLIER - 1.0)).min(1.0);
        normal + (max - normal) * above
    }
}

/// Map a 0.0..=1.0 volume onto a backend volume range
pub fn scale_volume(volume: f32, min: f32, max: f32) -> f32 {
    let volume = if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        1.0
    };
    min + (max - min) * volume
}
