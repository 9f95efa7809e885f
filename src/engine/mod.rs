//! Speech engine abstraction
//!
//! The controller only ever talks to a [`SpeechEngine`]. Completion of an
//! utterance and changes to the voice list come back as [`EngineEvent`]s
//! pushed through an [`EventSender`], so the controller can process them one
//! at a time on its own thread.

pub mod native;
pub mod unavailable;

pub use native::NativeEngine;
pub use unavailable::UnavailableEngine;

use crate::catalog::Voice;
use crate::Result;
use log::{debug, info, warn};
use mio::Waker;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Identifier the controller assigns to each submitted utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Notifications delivered by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The utterance began playing
    Started(UtteranceId),
    /// The utterance finished (or was stopped by the engine)
    Ended(UtteranceId),
    /// The engine gave up on the utterance
    Failed {
        utterance: UtteranceId,
        message: String,
    },
    /// The engine's voice list is different from before
    VoicesChanged,
}

/// One piece of text to synthesize, with engine-native settings
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRequest {
    pub id: UtteranceId,
    pub text: String,
    /// Forced voice; `None` leaves the engine default in place
    pub voice: Option<Voice>,
    /// Rate multiplier, 1.0 is the engine's normal speed
    pub rate: f32,
    /// Volume, 0.0 to 1.0
    pub volume: f32,
}

/// Cloneable handle engines use to report events
///
/// Sending never blocks. When a waker is attached the event loop is woken
/// after each event, which lets engine callbacks fire from any thread.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<EngineEvent>,
    waker: Option<Arc<Waker>>,
}

impl EventSender {
    /// Create a sender and the receiving end the event loop drains
    pub fn channel() -> (Self, Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx, waker: None }, rx)
    }

    /// Wake the given poll whenever an event is sent
    pub fn with_waker(mut self, waker: Arc<Waker>) -> Self {
        self.waker = Some(waker);
        self
    }

    /// Push an event to the controller
    pub fn send(&self, event: EngineEvent) {
        debug!("Engine event: {:?}", event);
        if self.tx.send(event).is_err() {
            debug!("Event receiver dropped, discarding engine event");
            return;
        }
        if let Some(waker) = &self.waker {
            if let Err(e) = waker.wake() {
                warn!("Failed to wake event loop: {}", e);
            }
        }
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("waker", &self.waker.is_some())
            .finish()
    }
}

/// Speech engine capability
///
/// Implementations never block waiting for playback: `speak` returns once the
/// utterance is queued and progress is reported through the sender.
pub trait SpeechEngine {
    /// Whether speech synthesis is available at all
    fn is_supported(&self) -> bool;

    /// Current voice list, in engine order
    fn list_voices(&self) -> Result<Vec<Voice>>;

    /// Report `EngineEvent::VoicesChanged` through `events` from now on
    fn on_voices_changed(&mut self, events: EventSender) -> Result<()>;

    /// Start speaking; `Started`/`Ended`/`Failed` arrive later via `events`
    fn speak(&mut self, request: UtteranceRequest, events: EventSender) -> Result<()>;

    /// Stop the current utterance without waiting for acknowledgement
    fn cancel_current(&mut self) -> Result<()>;

    /// Periodic housekeeping for engines that cannot push every event
    fn poll(&mut self) {}
}

/// Create the platform speech engine
///
/// Falls back to an [`UnavailableEngine`] when the platform backend cannot be
/// initialized, so callers always get something to report support status on.
pub fn create_engine() -> Box<dyn SpeechEngine> {
    info!(
        "Creating native speech engine for platform: {}",
        std::env::consts::OS
    );

    match NativeEngine::new() {
        Ok(engine) => {
            info!("Native speech engine initialized");
            Box::new(engine)
        }
        Err(e) => {
            warn!("Native speech engine unavailable: {}", e);
            Box::new(UnavailableEngine::new(e.to_string()))
        }
    }
}
