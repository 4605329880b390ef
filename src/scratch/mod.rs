//! Temporary file management for voice downloads and conversions.

mod file;

pub use file::{AudioFormat, ScratchFile, write_stream};
