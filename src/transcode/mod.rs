//! Audio conversion module.
//!
//! Wraps the external ffmpeg executable used to downmix voice files.

mod transcoder;

pub use transcoder::Transcoder;

#[cfg(all(test, unix))]
pub(crate) use transcoder::tests::copying_ffmpeg;
