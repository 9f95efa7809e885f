//! Voice catalog and its language-grouped view
//!
//! The catalog is a read-only snapshot of the voices the speech engine
//! reports. Grouping and default selection are pure functions over it so
//! the terminal view (or any other front end) only has to render the result.

pub mod languages;

use languages::{language_code, language_name};
use serde::Serialize;
use std::collections::BTreeMap;

/// Label of the disabled entry shown when no voices exist
pub const NO_VOICES_PLACEHOLDER: &str = "No voices available";

/// A synthetic voice as reported by the speech engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    /// Voice name, unique within a catalog
    pub name: String,

    /// Language tag, e.g. "es-ES"
    pub language: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
        }
    }
}

/// Voices sharing one display language
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceGroup {
    pub display_name: String,
    pub voices: Vec<Voice>,
}

/// What a voice selector should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "groups", rename_all = "snake_case")]
pub enum CatalogView {
    /// Single disabled placeholder entry
    Empty,
    /// Groups sorted by display name
    Groups(Vec<VoiceGroup>),
}

impl Default for CatalogView {
    fn default() -> Self {
        CatalogView::Empty
    }
}

impl CatalogView {
    /// Build the grouped view for a list of voices
    ///
    /// Voices keep catalog order inside their group.
    pub fn build(voices: &[Voice]) -> Self {
        if voices.is_empty() {
            return CatalogView::Empty;
        }

        let mut grouped: BTreeMap<String, Vec<Voice>> = BTreeMap::new();
        for voice in voices {
            let name = language_name(language_code(&voice.language));
            grouped.entry(name).or_default().push(voice.clone());
        }

        CatalogView::Groups(
            grouped
                .into_iter()
                .map(|(display_name, voices)| VoiceGroup {
                    display_name,
                    voices,
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CatalogView::Empty)
    }

    /// Groups in display order (none for the placeholder)
    pub fn groups(&self) -> &[VoiceGroup] {
        match self {
            CatalogView::Empty => &[],
            CatalogView::Groups(groups) => groups,
        }
    }
}

/// First voice, in catalog order, whose language tag starts with `prefix`
pub fn default_voice<'a>(voices: &'a [Voice], prefix: &str) -> Option<&'a Voice> {
    voices.iter().find(|v| v.language.starts_with(prefix))
}

/// Snapshot of the engine's voices
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
    view: CatalogView,
}

impl VoiceCatalog {
    pub fn new(voices: Vec<Voice>) -> Self {
        let view = CatalogView::build(&voices);
        Self { voices, view }
    }

    /// Replace the whole catalog, rebuilding the grouped view
    pub fn replace(&mut self, voices: Vec<Voice>) {
        *self = Self::new(voices);
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Look up a voice by exact name
    pub fn find(&self, name: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.name == name)
    }

    /// Grouped view of the current voices
    pub fn view(&self) -> &CatalogView {
        &self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Voice> {
        vec![
            Voice::new("A", "es-ES"),
            Voice::new("B", "en-US"),
            Voice::new("C", "es-MX"),
            Voice::new("D", "xx-YY"),
            Voice::new("E", "en-GB"),
        ]
    }

    #[test]
    fn test_example_grouping() {
        let voices = vec![Voice::new("A", "es-ES"), Voice::new("B", "en-US")];
        let view = CatalogView::build(&voices);

        assert_eq!(
            view,
            CatalogView::Groups(vec![
                VoiceGroup {
                    display_name: "English".to_string(),
                    voices: vec![Voice::new("B", "en-US")],
                },
                VoiceGroup {
                    display_name: "Spanish".to_string(),
                    voices: vec![Voice::new("A", "es-ES")],
                },
            ])
        );
        assert_eq!(default_voice(&voices, "es").map(|v| v.name.as_str()), Some("A"));
    }

    #[test]
    fn test_groups_sorted_and_complete() {
        let voices = sample();
        let view = CatalogView::build(&voices);

        let names: Vec<&str> = view.groups().iter().map(|g| g.display_name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names, vec!["English", "Language (xx)", "Spanish"]);

        let total: usize = view.groups().iter().map(|g| g.voices.len()).sum();
        assert_eq!(total, voices.len());
        for voice in &voices {
            let hits = view
                .groups()
                .iter()
                .filter(|g| g.voices.contains(voice))
                .count();
            assert_eq!(hits, 1, "{} should be in exactly one group", voice.name);
        }
    }

    #[test]
    fn test_group_keeps_catalog_order() {
        let view = CatalogView::build(&sample());
        let spanish = &view.groups()[2];
        let names: Vec<&str> = spanish.voices.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_default_voice_uses_catalog_order() {
        let voices = vec![
            Voice::new("Zed", "en-US"),
            Voice::new("Mateo", "es-MX"),
            Voice::new("Alba", "es-ES"),
        ];
        assert_eq!(default_voice(&voices, "es").map(|v| v.name.as_str()), Some("Mateo"));
        assert!(default_voice(&voices, "fr").is_none());
    }

    #[test]
    fn test_empty_catalog_is_placeholder() {
        let catalog = VoiceCatalog::new(Vec::new());
        assert!(catalog.is_empty());
        assert_eq!(catalog.view(), &CatalogView::Empty);
        assert!(catalog.view().groups().is_empty());
    }

    #[test]
    fn test_replace_does_not_accumulate() {
        let mut catalog = VoiceCatalog::new(sample());
        catalog.replace(sample());
        assert_eq!(catalog.len(), 5);
        let total: usize = catalog.view().groups().iter().map(|g| g.voices.len()).sum();
        assert_eq!(total, 5);

        catalog.replace(Vec::new());
        assert_eq!(catalog.view(), &CatalogView::Empty);
    }

    #[test]
    fn test_find() {
        let catalog = VoiceCatalog::new(sample());
        assert_eq!(catalog.find("C").map(|v| v.language.as_str()), Some("es-MX"));
        assert!(catalog.find("missing").is_none());
    }

    #[test]
    fn test_view_serializes() {
        let json = serde_json::to_value(CatalogView::Empty).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "empty" }));

        let json = serde_json::to_value(CatalogView::build(&[Voice::new("A", "es-ES")])).unwrap();
        assert_eq!(json["kind"], "groups");
        assert_eq!(json["groups"][0]["display_name"], "Spanish");
        assert_eq!(json["groups"][0]["voices"][0]["name"], "A");
    }
}
