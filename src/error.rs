//! Error types shared by the transport, pipeline and dispatcher.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that can occur while relaying a voice message.
///
/// The `Display` output is what the sender sees in the failure reply, so no variant
/// may include a URL (Telegram file URLs embed the bot token).
#[derive(Debug, Error)]
pub enum Error {
    /// The voice file id could not be resolved to a download URL.
    #[error("failed to look up voice file: {0}")]
    Lookup(String),

    /// Fetching the remote audio failed.
    #[error("failed to download voice file: {0}")]
    Download(String),

    /// The conversion executable could not be started, failed or timed out.
    #[error("failed to convert voice file: {reason}")]
    Transcode {
        reason: String, // Short failure description
        output: String, // Combined stdout/stderr of the process (may be empty)
    },

    /// The recognition service call failed or returned an error status.
    #[error("speech recognition failed: {0}")]
    Recognition(String),

    /// A local filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Webhook delivery could not be disabled at startup.
    #[error("failed to delete webhook: {0}")]
    WebhookDisable(String),

    /// The Bot API acknowledged a call with `ok: false`.
    #[error("telegram {method} failed: {description}")]
    Telegram { method: &'static str, description: String },

    /// The Bot API could not be reached.
    #[error("telegram {method} request failed: {source}")]
    Http {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl Error {
    /// Wrap an I/O error with a short description of the failed operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io { context: context.into(), source }
    }

    /// Wrap a Bot API transport error, stripping the URL (it contains the token).
    pub fn http(method: &'static str, source: reqwest::Error) -> Self {
        Error::Http { method, source: source.without_url() }
    }
}
