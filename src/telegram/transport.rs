//! The chat transport seam used by the update dispatcher.

use async_trait::async_trait;

use super::types::Update;
use crate::error::Result;

/// Operations the dispatcher needs from the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Disable webhook delivery so updates can be polled.
    ///
    /// # Errors
    /// Returns `Error::WebhookDisable` if the platform refuses.
    async fn delete_webhook(&self) -> Result<()>;

    /// Fetch pending updates starting at `offset`, waiting up to `timeout` seconds.
    async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>>;

    /// Resolve a file id into a direct download URL.
    ///
    /// # Errors
    /// Returns `Error::Lookup` if the id is invalid or expired.
    async fn resolve_file_url(&self, file_id: &str) -> Result<String>;

    /// Send a plain text message to a chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Show the "typing..." indicator in a chat.
    async fn send_typing(&self, chat_id: i64) -> Result<()>;
}
