//! Wit.ai speech recognition client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, info};

use super::types::{Transcription, WitSpeechResponse};
use crate::config::AppConfig;
use crate::error::{Error, Result};

/// MIME type Wit.ai expects for MP3 uploads.
const MP3_CONTENT_TYPE: &str = "audio/mpeg3";

/// Turns an audio file into text.
#[async_trait]
pub trait SpeechClassifier: Send + Sync {
    /// Classify the speech in the file at `path`.
    ///
    /// # Errors
    /// Returns `Error::Recognition` on transport failure or a non-success response.
    /// A response without text is not an error.
    async fn classify_speech(&self, path: &Path) -> Result<Transcription>;
}

/// Client for the Wit.ai `/speech` endpoint.
#[derive(Clone)]
pub struct WitClient {
    client: reqwest::Client, // Shared HTTP client
    api_url: String,         // Base URL without trailing slash
    api_version: String,     // Value of the `v` query parameter
    token: String,           // Server access token
    timeout: Duration,       // Per-request timeout
}

impl WitClient {
    /// Create a new Wit.ai client.
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `config` - Application configuration (token, API URL/version, timeout)
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            api_url: config.wit_api_url.clone(),
            api_version: config.wit_api_version.clone(),
            token: config.wit_token.clone(),
            timeout: config.recognition_timeout(),
        }
    }

    fn request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Recognition(format!("Wit.ai request timed out after {:?}", self.timeout))
        } else {
            Error::Recognition(e.without_url().to_string())
        }
    }
}

#[async_trait]
impl SpeechClassifier for WitClient {
    async fn classify_speech(&self, path: &Path) -> Result<Transcription> {
        let audio = tokio::fs::read(path).await.map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;

        info!("🧠 Sending {} bytes to Wit.ai", audio.len());

        let resp = self
            .client
            .post(format!("{}/speech?v={}", self.api_url, self.api_version))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, MP3_CONTENT_TYPE)
            .timeout(self.timeout)
            .body(audio)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.request_error(e))?;

        if !status.is_success() {
            return Err(Error::Recognition(format!("Wit.ai returned {}: {}", status, body.trim())));
        }

        let transcription = parse_speech_response(&body)?;
        debug!("Wit.ai result: {:?}", transcription);
        Ok(transcription)
    }
}

/// Pick the result out of a (possibly streamed) `/speech` response body.
///
/// Streams carry a final transcription followed by a final understanding, both
/// flagged `is_final`; the last final object wins. Without any final object the
/// last one is used.
fn parse_speech_response(body: &str) -> Result<Transcription> {
    let mut last: Option<WitSpeechResponse> = None;
    let mut last_final: Option<WitSpeechResponse> = None;

    for chunk in serde_json::Deserializer::from_str(body).into_iter::<WitSpeechResponse>() {
        let chunk = chunk.map_err(|e| Error::Recognition(format!("invalid Wit.ai response: {}", e)))?;
        if let Some(error) = chunk.error {
            return Err(Error::Recognition(error));
        }
        if chunk.is_final.unwrap_or(false) {
            last_final = Some(chunk);
        } else {
            last = Some(chunk);
        }
    }

    Ok(last_final.or(last).map(Transcription::from).unwrap_or_default())
}
