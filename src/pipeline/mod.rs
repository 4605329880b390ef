//! Voice message pipeline.
//!
//! Composes temporary files, ffmpeg conversion and speech recognition into a
//! single "voice URL to text" operation.

mod voice;

pub use voice::{VoicePipeline, VoiceToText};
