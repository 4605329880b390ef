//! Update dispatcher: the long-poll loop that answers voice messages.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::Result;
use crate::pipeline::VoiceToText;
use crate::telegram::{ChatTransport, Message, Update};

/// Reply for messages without a voice attachment.
pub const NO_VOICE_PROMPT: &str = "Let me hear your voice.";

/// Reply when the voice was processed but no speech was recognized.
pub const NOTHING_RECOGNIZED: &str = "Failed to analyze your voice.";

/// Reply prefix when processing the voice failed.
const FAILURE_PREFIX: &str = "Failed to analyze your voice";

/// Polls the chat transport and handles one update at a time.
pub struct Dispatcher<T, V> {
    transport: T,            // Chat platform
    voice: V,                // Voice-to-text pipeline
    poll_interval: Duration, // Pause between poll cycles
    poll_timeout: u64,       // Long-poll timeout in seconds
}

impl<T: ChatTransport, V: VoiceToText> Dispatcher<T, V> {
    /// Create a new dispatcher.
    ///
    /// # Arguments
    /// * `transport` - Chat transport used to poll and reply
    /// * `voice` - Pipeline that turns voice URLs into text
    /// * `config` - Application configuration (poll interval and timeout)
    pub fn new(transport: T, voice: V, config: &AppConfig) -> Self {
        Self { transport, voice, poll_interval: config.poll_interval(), poll_timeout: config.poll_timeout }
    }

    /// Disable webhook delivery, then poll for updates until `shutdown` is cancelled.
    ///
    /// Updates are handled strictly one after another; an update being handled is
    /// always finished before shutdown takes effect.
    ///
    /// # Errors
    /// Returns `Error::WebhookDisable` if webhook delivery cannot be turned off; the
    /// poll loop is never entered in that case. Poll failures are logged and retried.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        self.transport.delete_webhook().await?;

        info!("👂 Waiting for voice messages...");

        let mut offset: i64 = 0;

        while !shutdown.is_cancelled() {
            let polled = tokio::select! {
                result = self.transport.get_updates(offset, self.poll_timeout) => result,
                _ = shutdown.cancelled() => break,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    warn!("⚠️ Failed to poll updates: {}", e);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        debug!("Poll loop stopped at offset {}", offset);
        Ok(())
    }

    /// Handle a single update: reply to its message, if any.
    pub async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            debug!("Ignoring update {} without a message", update.update_id);
            return;
        };

        let chat_id = message.chat.id;

        // Fire and forget
        if let Err(e) = self.transport.send_typing(chat_id).await {
            debug!("Failed to send typing indicator: {}", e);
        }

        let reply = self.reply_for(&message).await;
        if let Err(e) = self.transport.send_message(chat_id, &reply).await {
            error!("❌ Failed to send message to chat {}: {}", chat_id, e);
        }
    }

    /// Build the reply text for a message.
    async fn reply_for(&self, message: &Message) -> String {
        let Some(voice) = &message.voice else {
            debug!(
                "Message {} from {} has no voice (text: {:?})",
                message.message_id,
                message.from.as_ref().map_or(0, |u| u.id),
                message.text
            );
            return NO_VOICE_PROMPT.to_string();
        };

        info!(
            "🎤 Voice message {} in chat {} ({}s, {} bytes, {})",
            message.message_id,
            message.chat.id,
            voice.duration.unwrap_or(0),
            voice.file_size.unwrap_or(0),
            voice.mime_type.as_deref().unwrap_or("unknown type")
        );

        let result = match self.transport.resolve_file_url(&voice.file_id).await {
            Ok(url) => self.voice.voice_to_text(&url).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(text) if text.is_empty() => NOTHING_RECOGNIZED.to_string(),
            Ok(text) => text,
            Err(e) => {
                error!("❌ Failed to analyze voice message {}: {}", message.message_id, e);
                format!("{}: {}", FAILURE_PREFIX, e)
            }
        }
    }
}
