//! Terminal rendering of the playback controls

use crate::catalog::{CatalogView, NO_VOICES_PLACEHOLDER};
use crate::playback::view::{ButtonLabel, EngineStatus, PlaybackView};
use log::warn;
use std::io::{self, Write};

/// Render the voice selector as indented text
///
/// The selected voice is marked with `*`; an empty catalog shows the
/// disabled placeholder in parentheses.
pub fn render_catalog(view: &CatalogView, selected: Option<&str>) -> String {
    let mut out = String::from("Voices:\n");
    match view {
        CatalogView::Empty => {
            out.push_str(&format!("  ({})\n", NO_VOICES_PLACEHOLDER));
        }
        CatalogView::Groups(groups) => {
            for group in groups {
                out.push_str(&format!("  {}\n", group.display_name));
                for voice in &group.voices {
                    let mark = if selected == Some(voice.name.as_str()) {
                        '*'
                    } else {
                        ' '
                    };
                    out.push_str(&format!("   {} {} [{}]\n", mark, voice.name, voice.language));
                }
            }
        }
    }
    out
}

/// [`PlaybackView`] that prints to a terminal
pub struct TerminalView<W: Write> {
    out: W,
    controls_enabled: bool,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            controls_enabled: true,
        }
    }

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl<W: Write> PlaybackView for TerminalView<W> {
    fn show_status(&mut self, status: EngineStatus) {
        self.print(&format!("Status: {}", status));
    }

    fn disable_controls(&mut self) {
        self.controls_enabled = false;
        self.print("Controls disabled");
    }

    fn show_catalog(&mut self, view: &CatalogView, selected: Option<&str>) {
        let text = render_catalog(view, selected);
        self.print(text.trim_end());
    }

    fn set_button(&mut self, label: ButtonLabel) {
        self.print(&format!("[ {} ]", label));
    }

    fn alert(&mut self, message: &str) {
        self.print(&format!("! {}", message));
    }
}
