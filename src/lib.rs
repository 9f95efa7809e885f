//! voxplay - terminal text-to-speech player
//!
//! Loads the voices of the platform speech engine, groups them by language
//! and plays back text at a configurable rate and volume.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod input;
pub mod playback;
pub mod ui;

pub use error::{Result, ValidationError, VoxError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
