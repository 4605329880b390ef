//! Voice file conversion using an external ffmpeg process.
//!
//! Wit.ai rejects multi-channel audio, so every voice file is downmixed to mono
//! MP3 before it is sent for recognition.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{Error, Result};

/// Extension of the converted file (and the format ffmpeg infers from it).
pub const OUTPUT_EXTENSION: &str = "mp3";

/// Converts downloaded voice files into the format the recognition service accepts.
#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg_path: PathBuf, // ffmpeg executable (bare name is resolved on PATH)
    timeout: Duration,    // Upper bound for a single conversion
}

impl Transcoder {
    /// Create a transcoder from the application configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_binary(config.ffmpeg_path.clone(), config.transcode_timeout())
    }

    /// Create a transcoder for an explicit executable and timeout.
    pub fn with_binary(ffmpeg_path: PathBuf, timeout: Duration) -> Self {
        Self { ffmpeg_path, timeout }
    }

    /// Path the converted file for `input` will be written to.
    pub fn output_path_for(input: &Path) -> PathBuf {
        let mut name = input.as_os_str().to_os_string();
        name.push(".");
        name.push(OUTPUT_EXTENSION);
        PathBuf::from(name)
    }

    /// Convert `input` to mono MP3.
    ///
    /// Runs `ffmpeg -i <input> -ac 1 <input>.mp3` to completion.
    ///
    /// # Arguments
    /// * `input` - Downloaded voice file
    ///
    /// # Returns
    /// Path of the converted file.
    ///
    /// # Errors
    /// Returns `Error::Transcode` if ffmpeg cannot be started, exits non-zero or
    /// exceeds the timeout. A partial output file may exist; the caller owns its cleanup.
    pub async fn transcode(&self, input: &Path) -> Result<PathBuf> {
        let output_path = Self::output_path_for(input);

        debug!("Converting {} -> {}", input.display(), output_path.display());

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .arg("-i")
            .arg(input)
            .args(["-ac", "1"])
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(Error::Transcode { reason: format!("failed to start {}: {}", self.ffmpeg_path.display(), e), output: String::new() });
            }
            Err(_) => {
                return Err(Error::Transcode { reason: format!("ffmpeg timed out after {:?}", self.timeout), output: String::new() });
            }
        };

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(Error::Transcode { reason: format!("ffmpeg exited with {}", output.status), output: combined });
        }

        info!("🔄 Converted voice file to mono {}", OUTPUT_EXTENSION);
        Ok(output_path)
    }
}
