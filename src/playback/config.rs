//! Configuration management

use crate::playback::{
    check_rate, check_volume, PlaybackSettings, PlaybackState, DEFAULT_LANGUAGE,
    DEFAULT_MAX_TEXT_LENGTH, DEFAULT_RATE_WPM, DEFAULT_VOLUME,
};
use crate::{Result, VoxError};
use ini::Ini;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

const SPEECH: &str = "speech";

/// Persistent playback settings (~/.voxplay.cfg)
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path
    path: PathBuf,
}

impl Config {
    /// Load configuration from the home directory, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from `path`, writing defaults there if it does not exist
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| VoxError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| VoxError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| VoxError::Config(format!("Failed to save config: {}", e)))
    }

    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".voxplay.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some(SPEECH))
            .set("rate", DEFAULT_RATE_WPM.to_string())
            .set("volume", DEFAULT_VOLUME.to_string())
            .set("language", DEFAULT_LANGUAGE)
            .set("max_text_length", DEFAULT_MAX_TEXT_LENGTH.to_string());

        ini
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get a float value from config
    pub fn get_float(&self, section: &str, key: &str, default: f32) -> f32 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Speech rate in words per minute
    pub fn rate(&self) -> f32 {
        let rate = self.get_float(SPEECH, "rate", DEFAULT_RATE_WPM);
        check_rate(rate).unwrap_or_else(|e| {
            warn!("Ignoring rate in config: {}", e);
            DEFAULT_RATE_WPM
        })
    }

    /// Speech volume (0.0-1.0)
    pub fn volume(&self) -> f32 {
        let volume = self.get_float(SPEECH, "volume", DEFAULT_VOLUME);
        check_volume(volume).unwrap_or_else(|e| {
            warn!("Ignoring volume in config: {}", e);
            DEFAULT_VOLUME
        })
    }

    /// Preferred voice name, if one was saved
    pub fn voice(&self) -> Option<String> {
        self.ini
            .get_from(Some(SPEECH), "voice")
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Language prefix used to pick the default voice
    pub fn language(&self) -> String {
        self.get_string(SPEECH, "language", DEFAULT_LANGUAGE)
    }

    /// Longest text accepted for playback, in characters
    pub fn max_text_length(&self) -> usize {
        self.ini
            .get_from(Some(SPEECH), "max_text_length")
            .and_then(|v| v.trim().parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(DEFAULT_MAX_TEXT_LENGTH)
    }

    /// All playback settings in one place
    pub fn settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            rate: self.rate(),
            volume: self.volume(),
            voice: self.voice(),
            language: self.language(),
            max_text_length: self.max_text_length(),
        }
    }

    /// Copy the user-adjustable parts of the playback state into the config
    pub fn store(&mut self, state: &PlaybackState) {
        self.set(SPEECH, "rate", &state.rate().to_string());
        self.set(SPEECH, "volume", &state.volume().to_string());
        match state.selected_voice() {
            Some(voice) => self.set(SPEECH, "voice", voice),
            None => {
                self.ini.delete_from(Some(SPEECH), "voice");
            }
        }
    }
}
