//! Wit.ai speech response types.

use serde::Deserialize;

/// One JSON object from the `/speech` response stream.
///
/// Current API versions stream partial transcriptions followed by a final
/// understanding; legacy versions return a single object with `_text`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WitSpeechResponse {
    #[serde(default, alias = "_text")]
    pub text: Option<String>,
    #[serde(default)]
    pub is_final: Option<bool>,
    #[serde(default)]
    pub msg_id: Option<String>,
    #[serde(default)]
    pub intents: Vec<Intent>,
    #[serde(default)]
    pub error: Option<String>,
}

/// An intent detected by Wit.ai.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Intent {
    pub name: String,
    pub confidence: f64,
}

/// Result of classifying one audio file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcription {
    /// Recognized text; `None` when the service understood nothing.
    pub text: Option<String>,
    pub msg_id: Option<String>,
    pub intents: Vec<Intent>,
}

impl Transcription {
    /// The intent Wit.ai is most confident about.
    pub fn top_intent(&self) -> Option<&Intent> {
        self.intents.iter().max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }

    /// Confidence of the top intent, if any.
    pub fn confidence(&self) -> Option<f64> {
        self.top_intent().map(|i| i.confidence)
    }
}

impl From<WitSpeechResponse> for Transcription {
    fn from(resp: WitSpeechResponse) -> Self {
        let text = resp.text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        Self { text, msg_id: resp.msg_id, intents: resp.intents }
    }
}
