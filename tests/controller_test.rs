//! Playback controller tests
//!
//! Drive the controller with a scripted engine and a recording view, the way
//! the event loop would: user actions on one side, engine events on the other.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::Receiver;
use voxplay::catalog::{CatalogView, Voice};
use voxplay::engine::{EngineEvent, EventSender, SpeechEngine, UtteranceId, UtteranceRequest};
use voxplay::playback::view::{ButtonLabel, EngineStatus, PlaybackView};
use voxplay::playback::{Phase, PlaybackController, PlaybackSettings, ToggleOutcome};
use voxplay::{Result, ValidationError, VoxError};

#[derive(Default)]
struct EngineLog {
    supported: bool,
    voices: Vec<Voice>,
    fail_speak: bool,
    spoken: Vec<UtteranceRequest>,
    cancels: usize,
    voice_listener: Option<EventSender>,
}

struct ScriptedEngine(Rc<RefCell<EngineLog>>);

impl SpeechEngine for ScriptedEngine {
    fn is_supported(&self) -> bool {
        self.0.borrow().supported
    }

    fn list_voices(&self) -> Result<Vec<Voice>> {
        Ok(self.0.borrow().voices.clone())
    }

    fn on_voices_changed(&mut self, events: EventSender) -> Result<()> {
        self.0.borrow_mut().voice_listener = Some(events);
        Ok(())
    }

    fn speak(&mut self, request: UtteranceRequest, _events: EventSender) -> Result<()> {
        let mut log = self.0.borrow_mut();
        if log.fail_speak {
            return Err(VoxError::Engine("audio device busy".to_string()));
        }
        log.spoken.push(request);
        Ok(())
    }

    fn cancel_current(&mut self) -> Result<()> {
        self.0.borrow_mut().cancels += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ViewCall {
    Status(EngineStatus),
    Disabled,
    Catalog(CatalogView, Option<String>),
    Button(ButtonLabel),
    Alert(String),
}

struct RecordingView(Rc<RefCell<Vec<ViewCall>>>);

impl PlaybackView for RecordingView {
    fn show_status(&mut self, status: EngineStatus) {
        self.0.borrow_mut().push(ViewCall::Status(status));
    }

    fn disable_controls(&mut self) {
        self.0.borrow_mut().push(ViewCall::Disabled);
    }

    fn show_catalog(&mut self, view: &CatalogView, selected: Option<&str>) {
        self.0
            .borrow_mut()
            .push(ViewCall::Catalog(view.clone(), selected.map(str::to_string)));
    }

    fn set_button(&mut self, label: ButtonLabel) {
        self.0.borrow_mut().push(ViewCall::Button(label));
    }

    fn alert(&mut self, message: &str) {
        self.0.borrow_mut().push(ViewCall::Alert(message.to_string()));
    }
}

struct Harness {
    controller: PlaybackController,
    engine: Rc<RefCell<EngineLog>>,
    view: Rc<RefCell<Vec<ViewCall>>>,
    rx: Receiver<EngineEvent>,
}

impl Harness {
    fn new(voices: Vec<Voice>) -> Self {
        Self::with(voices, true, PlaybackSettings::default())
    }

    fn with(voices: Vec<Voice>, supported: bool, settings: PlaybackSettings) -> Self {
        let engine = Rc::new(RefCell::new(EngineLog {
            supported,
            voices,
            ..EngineLog::default()
        }));
        let view = Rc::new(RefCell::new(Vec::new()));
        let (events, rx) = EventSender::channel();
        let controller = PlaybackController::new(
            Box::new(ScriptedEngine(Rc::clone(&engine))),
            Box::new(RecordingView(Rc::clone(&view))),
            events,
            settings,
        );
        Self {
            controller,
            engine,
            view,
            rx,
        }
    }

    fn last_button(&self) -> Option<ButtonLabel> {
        self.view.borrow().iter().rev().find_map(|call| match call {
            ViewCall::Button(label) => Some(*label),
            _ => None,
        })
    }

    fn pump(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.controller.handle_event(event);
        }
    }
}

fn two_voices() -> Vec<Voice> {
    vec![Voice::new("A", "es-ES"), Voice::new("B", "en-US")]
}

#[test]
fn test_initialize_groups_and_selects_spanish() {
    let mut h = Harness::new(two_voices());
    h.controller.initialize().unwrap();

    let groups: Vec<(String, Vec<String>)> = h
        .controller
        .catalog_view()
        .groups()
        .iter()
        .map(|g| {
            (
                g.display_name.clone(),
                g.voices.iter().map(|v| v.name.clone()).collect(),
            )
        })
        .collect();
    assert_eq!(
        groups,
        vec![
            ("English".to_string(), vec!["B".to_string()]),
            ("Spanish".to_string(), vec!["A".to_string()]),
        ]
    );
    assert_eq!(h.controller.state().selected_voice(), Some("A"));

    let view = h.view.borrow();
    assert_eq!(view[0], ViewCall::Status(EngineStatus::Available));
    assert!(view.contains(&ViewCall::Catalog(
        CatalogView::build(&two_voices()),
        Some("A".to_string())
    )));
    assert!(h.engine.borrow().voice_listener.is_some());
}

#[test]
fn test_no_spanish_means_no_selection() {
    let mut h = Harness::new(vec![Voice::new("B", "en-US"), Voice::new("F", "fr-FR")]);
    h.controller.initialize().unwrap();
    assert_eq!(h.controller.state().selected_voice(), None);
}

#[test]
fn test_configured_voice_wins_over_language_default() {
    let settings = PlaybackSettings {
        voice: Some("B".to_string()),
        ..PlaybackSettings::default()
    };
    let mut h = Harness::with(two_voices(), true, settings);
    h.controller.initialize().unwrap();
    assert_eq!(h.controller.state().selected_voice(), Some("B"));
}

#[test]
fn test_empty_catalog_shows_placeholder() {
    let mut h = Harness::new(Vec::new());
    h.controller.initialize().unwrap();

    assert_eq!(h.controller.catalog_view(), &CatalogView::Empty);
    assert_eq!(h.controller.state().selected_voice(), None);
    assert!(h
        .view
        .borrow()
        .contains(&ViewCall::Catalog(CatalogView::Empty, None)));
}

#[test]
fn test_unsupported_engine_disables_everything() {
    let mut h = Harness::with(two_voices(), false, PlaybackSettings::default());
    assert!(matches!(h.controller.initialize(), Err(VoxError::Unsupported)));
    assert!(h.controller.is_disabled());

    assert_eq!(
        *h.view.borrow(),
        vec![
            ViewCall::Status(EngineStatus::Unsupported),
            ViewCall::Disabled
        ]
    );
    assert!(matches!(
        h.controller.toggle_playback("hola", None, 175.0, 1.0),
        Err(VoxError::Unsupported)
    ));
    assert!(h.controller.set_rate(100.0).is_err());
    assert!(h.engine.borrow().spoken.is_empty());
}

#[test]
fn test_whitespace_text_is_rejected() {
    let mut h = Harness::new(two_voices());
    h.controller.initialize().unwrap();

    let outcome = h
        .controller
        .toggle_playback(" \t\n ", Some("A"), 175.0, 1.0)
        .unwrap();
    assert_eq!(outcome, ToggleOutcome::Rejected(ValidationError::EmptyText));
    assert!(h.engine.borrow().spoken.is_empty());
    assert_eq!(h.controller.state().phase(), Phase::Idle);
    assert_eq!(
        h.view.borrow().last(),
        Some(&ViewCall::Alert("Please enter some text to play".to_string()))
    );
}

#[test]
fn test_whitespace_text_while_speaking_keeps_speaking() {
    let mut h = Harness::new(two_voices());
    h.controller.initialize().unwrap();
    let id = match h.controller.toggle_playback("hola", None, 175.0, 1.0).unwrap() {
        ToggleOutcome::Submitted(id) => id,
        other => panic!("unexpected outcome {:?}", other),
    };
    h.controller.handle_event(EngineEvent::Started(id));

    h.controller.toggle_playback("   ", None, 175.0, 1.0).unwrap();
    assert!(h.controller.state().is_speaking());
    assert_eq!(h.engine.borrow().cancels, 0);
}

#[test]
fn test_full_playback_cycle() {
    let mut h = Harness::new(two_voices());
    h.controller.initialize().unwrap();

    let outcome = h
        .controller
        .toggle_playback("Hola mundo", Some("A"), 350.0, 0.8)
        .unwrap();
    let id = match outcome {
        ToggleOutcome::Submitted(id) => id,
        other => panic!("unexpected outcome {:?}", other),
    };

    {
        let engine = h.engine.borrow();
        assert_eq!(engine.spoken.len(), 1);
        assert_eq!(engine.spoken[0].id, id);
        assert_eq!(engine.spoken[0].rate, 2.0);
        assert_eq!(engine.spoken[0].volume, 0.8);
        assert_eq!(engine.spoken[0].voice, Some(Voice::new("A", "es-ES")));
    }
    assert!(!h.controller.state().is_speaking());

    h.controller.handle_event(EngineEvent::Started(id));
    assert!(h.controller.state().is_speaking());
    assert_eq!(h.last_button(), Some(ButtonLabel::Stop));
    assert_eq!(h.controller.button_label(), ButtonLabel::Stop);

    h.controller.handle_event(EngineEvent::Ended(id));
    assert!(!h.controller.state().is_speaking());
    assert_eq!(h.controller.state().phase(), Phase::Idle);
    assert_eq!(h.last_button(), Some(ButtonLabel::Play));
}

#[test]
fn test_rate_175_is_normal_speed() {
    let mut h = Harness::new(two_voices());
    h.controller.initialize().unwrap();
    h.controller
        .toggle_playback("hola", None, 175.0, 1.0)
        .unwrap();
    assert_eq!(h.engine.borrow().spoken[0].rate, 1.0);
}

#[test]
fn test_toggle_while_speaking_cancels_immediately() {
    let mut h = Harness::new(two_voices());
    h.controller.initialize().unwrap();

    let id = match h.controller.toggle_playback("hola", None, 175.0, 1.0).unwrap() {
        ToggleOutcome::Submitted(id) => id,
        other => panic!("unexpected outcome {:?}", other),
    };
    h.controller.handle_event(EngineEvent::Started(id));

    let outcome = h
        .controller
        .toggle_playback("hola", None, 175.0, 1.0)
        .unwrap();
    assert_eq!(outcome, ToggleOutcome::Cancelled);
    assert_eq!(h.engine.borrow().cancels, 1);
    assert!(!h.controller.state().is_speaking());
    assert_eq!(h.last_button(), Some(ButtonLabel::Play));

    // Late acknowledgement from the engine changes nothing
    h.controller.handle_event(EngineEvent::Ended(id));
    h.controller.handle_event(EngineEvent::Started(id));
    assert_eq!(h.controller.state().phase(), Phase::Idle);
    assert_eq!(h.engine.borrow().spoken.len(), 1);
}

#[test]
fn test_rapid_toggles_never_overlap() {
    let mut h = Harness::new(two_voices());
    h.controller.initialize().unwrap();

    for _ in 0..6 {
        h.controller
            .toggle_playback("hola", None, 175.0, 1.0)
            .unwrap();
    }

    let engine = h.engine.borrow();
    assert_eq!(engine.spoken.len(), 3);
    assert_eq!(engine.cancels, 3);
    let ids: Vec<UtteranceId> = engine.spoken.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![UtteranceId(1), UtteranceId(2), UtteranceId(3)]);
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(h.controller.state().phase(), Phase::Idle);
}

#[test]
fn test_engine_error_returns_to_idle() {
    let mut h = Harness::new(two_voices());
    h.controller.initialize().unwrap();

    let id = match h.controller.toggle_playback("hola", None, 175.0, 1.0).unwrap() {
        ToggleOutcome::Submitted(id) => id,
        other => panic!("unexpected outcome {:?}", other),
    };
    h.controller.handle_event(EngineEvent::Started(id));
    h.controller.handle_event(EngineEvent::Failed {
        utterance: id,
        message: "synthesis-failed".to_string(),
    });

    assert_eq!(h.controller.state().phase(), Phase::Idle);
    assert_eq!(h.last_button(), Some(ButtonLabel::Play));

    // The controller is still usable afterwards
    assert!(matches!(
        h.controller.toggle_playback("otra vez", None, 175.0, 1.0),
        Ok(ToggleOutcome::Submitted(_))
    ));
}

#[test]
fn test_speak_failure_is_recovered() {
    let mut h = Harness::new(two_voices());
    h.controller.initialize().unwrap();
    h.engine.borrow_mut().fail_speak = true;

    let outcome = h
        .controller
        .toggle_playback("hola", None, 175.0, 1.0)
        .unwrap();
    assert_eq!(outcome, ToggleOutcome::EngineFailed);
    assert_eq!(h.controller.state().phase(), Phase::Idle);
    assert_eq!(h.last_button(), Some(ButtonLabel::Play));
}

#[test]
fn test_voices_changed_replaces_catalog() {
    let mut h = Harness::new(Vec::new());
    h.controller.initialize().unwrap();
    assert!(h.controller.catalog().is_empty());

    // Voices arrive asynchronously, as some platforms do
    h.engine.borrow_mut().voices = two_voices();
    let listener = h.engine.borrow().voice_listener.clone().unwrap();
    listener.send(EngineEvent::VoicesChanged);
    listener.send(EngineEvent::VoicesChanged);
    h.pump();

    assert_eq!(h.controller.catalog().len(), 2);
    let total: usize = h
        .controller
        .catalog_view()
        .groups()
        .iter()
        .map(|g| g.voices.len())
        .sum();
    assert_eq!(total, 2);
    assert_eq!(h.controller.state().selected_voice(), Some("A"));
}

#[test]
fn test_stop_cancels_without_text() {
    let mut h = Harness::new(two_voices());
    h.controller.initialize().unwrap();
    h.controller
        .toggle_playback("hola", None, 175.0, 1.0)
        .unwrap();

    assert!(h.controller.stop().unwrap());
    assert_eq!(h.engine.borrow().cancels, 1);
    assert!(!h.controller.state().is_active());
}

#[test]
fn test_shutdown_cancels_active_utterance() {
    let mut h = Harness::new(two_voices());
    h.controller.initialize().unwrap();
    h.controller.toggle("hola").unwrap();

    h.controller.shutdown();
    assert_eq!(h.engine.borrow().cancels, 1);
    assert_eq!(h.controller.state().phase(), Phase::Idle);
}
