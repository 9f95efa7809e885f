//! Display names for voice language codes
//!
//! Voices are grouped by the first two characters of their language tag.
//! Only a fixed set of codes gets a proper name; anything else is shown
//! as "Language (xx)".

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Known two-letter language codes and their display names
pub static LANGUAGE_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("es", "Spanish");
    m.insert("en", "English");
    m.insert("fr", "French");
    m.insert("de", "German");
    m.insert("it", "Italian");
    m.insert("pt", "Portuguese");
    m.insert("ru", "Russian");
    m.insert("ja", "Japanese");
    m.insert("ko", "Korean");
    m.insert("zh", "Chinese");
    m.insert("ar", "Arabic");
    m.insert("hi", "Hindi");
    m
});

/// Two-character language code of a tag ("es-ES" -> "es")
///
/// Tags shorter than two characters are returned whole.
pub fn language_code(tag: &str) -> &str {
    match tag.char_indices().nth(2) {
        Some((idx, _)) => &tag[..idx],
        None => tag,
    }
}

/// Human-readable name for a two-character language code
pub fn language_name(code: &str) -> String {
    match LANGUAGE_NAMES.get(code) {
        Some(name) => (*name).to_string(),
        None => format!("Language ({})", code),
    }
}
