//! Voice pipeline: download, convert and recognize one voice message.
//!
//! Every intermediate file is held by a `ScratchFile` guard, so it is removed on
//! every exit path whether the run succeeds or fails.

use std::io;
use std::path::PathBuf;
use std::pin::pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tokio_util::io::StreamReader;
use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::recognition::SpeechClassifier;
use crate::scratch::{self, AudioFormat, ScratchFile};
use crate::transcode::Transcoder;

/// Turns a remote voice file into reply text.
#[async_trait]
pub trait VoiceToText: Send + Sync {
    /// Resolve the audio at `url` to text.
    ///
    /// # Returns
    /// The quoted transcription, or an empty string when nothing was recognized.
    async fn voice_to_text(&self, url: &str) -> Result<String>;
}

/// Download → ffmpeg → Wit.ai pipeline.
pub struct VoicePipeline<C> {
    client: reqwest::Client,    // Shared HTTP client for downloads
    scratch_dir: PathBuf,       // Where temporary files live
    download_timeout: Duration, // Upper bound for a single download
    transcoder: Transcoder,     // ffmpeg wrapper
    classifier: C,              // Speech recognition backend
}

impl<C: SpeechClassifier> VoicePipeline<C> {
    /// Create a new voice pipeline.
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `config` - Application configuration (scratch directory, ffmpeg, timeouts)
    /// * `classifier` - Speech recognition backend
    pub fn new(client: reqwest::Client, config: &AppConfig, classifier: C) -> Self {
        Self {
            client,
            scratch_dir: config.temp_dir.clone(),
            download_timeout: config.download_timeout(),
            transcoder: Transcoder::new(config),
            classifier,
        }
    }

    /// Download the voice file at `url`, convert it and run speech recognition.
    ///
    /// # Arguments
    /// * `url` - Direct download URL of the voice file
    ///
    /// # Returns
    /// The recognized text wrapped in double quotes, or an empty string when the
    /// service recognized nothing.
    ///
    /// # Errors
    /// Returns the first failure among download, conversion and recognition.
    /// Temporary files are removed before the error is returned.
    pub async fn resolve_voice_to_text(&self, url: &str) -> Result<String> {
        let raw = self.download(url).await?;

        // Guard the output path before ffmpeg runs so a partial file is removed too
        let converted = ScratchFile::reserve(Transcoder::output_path_for(raw.path()), AudioFormat::Transcoded);

        if let Err(e) = self.transcoder.transcode(raw.path()).await {
            if let Error::Transcode { output, .. } = &e
                && !output.is_empty()
            {
                error!("ffmpeg output:\n{}", output.trim_end());
            }
            return Err(e);
        }

        let transcription = self.classifier.classify_speech(converted.path()).await?;

        if let (Some(intent), Some(confidence)) = (transcription.top_intent(), transcription.confidence()) {
            debug!("Top intent: {} ({:.2})", intent.name, confidence);
        }

        match transcription.text {
            Some(text) => {
                info!("🗣️ Recognized (msg_id={}): {}", transcription.msg_id.as_deref().unwrap_or("-"), text);
                Ok(format!("\"{}\"", text))
            }
            None => {
                info!("🤷 No speech recognized");
                Ok(String::new())
            }
        }
    }

    /// Stream the remote file into a new raw scratch file.
    async fn download(&self, url: &str) -> Result<ScratchFile> {
        let (raw, mut file) = ScratchFile::create(&self.scratch_dir, AudioFormat::Raw).await?;

        info!("📥 Downloading voice file to {}", raw.path().display());

        let resp = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| download_error(e, self.download_timeout))?;

        let body = resp.bytes_stream().map_err(|e| io::Error::other(e.without_url()));
        let mut reader = pin!(StreamReader::new(body));

        let written = scratch::write_stream(&mut file, &mut reader)
            .await
            .map_err(|e| stream_error(e, self.download_timeout))?;

        info!("📥 Downloaded {} bytes", written);
        Ok(raw)
    }
}

#[async_trait]
impl<C: SpeechClassifier> VoiceToText for VoicePipeline<C> {
    async fn voice_to_text(&self, url: &str) -> Result<String> {
        self.resolve_voice_to_text(url).await
    }
}

fn download_error(e: reqwest::Error, timeout: Duration) -> Error {
    if e.is_timeout() {
        Error::Download(format!("timed out after {:?}", timeout))
    } else {
        Error::Download(e.without_url().to_string())
    }
}

/// Errors from the body stream are download failures; anything else came from the disk.
fn stream_error(e: io::Error, timeout: Duration) -> Error {
    match e.get_ref().and_then(|inner| inner.downcast_ref::<reqwest::Error>()) {
        Some(inner) if inner.is_timeout() => Error::Download(format!("timed out after {:?}", timeout)),
        Some(_) => Error::Download(e.to_string()),
        None => Error::io("failed to write downloaded voice file", e),
    }
}
