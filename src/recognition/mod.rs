//! Speech recognition module.
//!
//! Sends converted voice files to Wit.ai and extracts the recognized text.

mod client;
mod types;

pub use client::{SpeechClassifier, WitClient};
#[cfg(test)]
pub use types::Transcription;
