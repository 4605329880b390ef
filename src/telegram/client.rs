//! Telegram Bot API client.
//!
//! Thin wrapper over the HTTP endpoints the bot needs: identity check, webhook
//! removal, long polling, file lookup, messages and chat actions.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

use super::transport::ChatTransport;
use super::types::{File, TgResponse, Update, User};
use crate::config::AppConfig;
use crate::error::{Error, Result};

/// Maximum length of a single Telegram text message.
const MAX_MESSAGE_LEN: usize = 4096;

/// Extra seconds on top of the long-poll timeout before the HTTP request gives up.
const POLL_GRACE_SECS: u64 = 10;

/// Telegram Bot API client.
#[derive(Clone)]
pub struct BotClient {
    client: reqwest::Client, // Shared HTTP client
    api_url: String,         // Base URL without trailing slash
    token: String,           // Bot token (never logged)
}

impl BotClient {
    /// Create a new Bot API client.
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `config` - Application configuration (token and API base URL)
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self { client, api_url: config.telegram_api_url.clone(), token: config.telegram_token.clone() }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// Build the direct download URL for a file returned by getFile.
    pub fn file_url(&self, file: &File) -> Option<String> {
        file.file_path.as_ref().map(|path| format!("{}/file/bot{}/{}", self.api_url, self.token, path))
    }

    /// POST a JSON body to a Bot API method and unwrap the response envelope.
    async fn call<T: DeserializeOwned>(&self, method: &'static str, params: serde_json::Value, timeout: Option<Duration>) -> Result<Option<T>> {
        let mut request = self.client.post(self.method_url(method)).json(&params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let resp: TgResponse<T> = request
            .send()
            .await
            .map_err(|e| Error::http(method, e))?
            .json()
            .await
            .map_err(|e| Error::http(method, e))?;

        if !resp.ok {
            return Err(Error::Telegram { method, description: resp.description.unwrap_or_else(|| "no description".to_string()) });
        }
        Ok(resp.result)
    }

    /// Fetch the bot's own account (validates the token).
    pub async fn get_me(&self) -> Result<User> {
        self.call::<User>("getMe", json!({}), None)
            .await?
            .ok_or_else(|| Error::Telegram { method: "getMe", description: "empty result".to_string() })
    }

    /// Look up a file by id.
    pub async fn get_file(&self, file_id: &str) -> Result<File> {
        self.call::<File>("getFile", json!({ "file_id": file_id }), None)
            .await
            .map_err(|e| Error::Lookup(e.to_string()))?
            .ok_or_else(|| Error::Lookup(format!("no file returned for {}", file_id)))
    }
}

#[async_trait]
impl ChatTransport for BotClient {
    async fn delete_webhook(&self) -> Result<()> {
        match self.call::<bool>("deleteWebhook", json!({}), None).await {
            Ok(Some(true)) => {
                info!("Webhook deleted, switching to long polling");
                Ok(())
            }
            Ok(_) => Err(Error::WebhookDisable("request was not acknowledged".to_string())),
            Err(e) => Err(Error::WebhookDisable(e.to_string())),
        }
    }

    async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>> {
        let params = json!({
            "offset": offset,
            "timeout": timeout,
            "allowed_updates": ["message"],
        });
        let updates = self
            .call::<Vec<Update>>("getUpdates", params, Some(poll_request_timeout(timeout)))
            .await?
            .unwrap_or_default();
        if !updates.is_empty() {
            debug!("Received {} update(s)", updates.len());
        }
        Ok(updates)
    }

    async fn resolve_file_url(&self, file_id: &str) -> Result<String> {
        let file = self.get_file(file_id).await?;
        self.file_url(&file).ok_or_else(|| Error::Lookup(format!("file {} has no download path", file.file_id)))
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            self.call::<serde_json::Value>("sendMessage", json!({ "chat_id": chat_id, "text": chunk }), None).await?;
        }
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> Result<()> {
        self.call::<bool>("sendChatAction", json!({ "chat_id": chat_id, "action": "typing" }), None).await?;
        Ok(())
    }
}

/// Split text into chunks of at most `max_len` bytes, preferring line breaks.
fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        // Try to split at a newline
        let split_at = if end < text.len() { text[start..end].rfind('\n').map(|i| start + i + 1).unwrap_or(end) } else { end };
        chunks.push(&text[start..split_at]);
        start = split_at;
    }
    chunks
}

/// HTTP timeout for a long poll of `timeout` seconds.
fn poll_request_timeout(timeout: u64) -> Duration {
    Duration::from_secs(timeout.saturating_add(POLL_GRACE_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Route, StubServer};

    fn client_for(server: &StubServer) -> BotClient {
        BotClient { client: reqwest::Client::new(), api_url: server.base_url.clone(), token: "123:abc".to_string() }
    }

    #[tokio::test]
    async fn test_delete_webhook_ok() {
        let server = StubServer::start(vec![Route::json("/bot123:abc/deleteWebhook", r#"{"ok":true,"result":true,"description":"Webhook was deleted"}"#)]).await;
        client_for(&server).delete_webhook().await.unwrap();
        assert_eq!(server.requests()[0].request_line(), "POST /bot123:abc/deleteWebhook HTTP/1.1");
    }

    #[tokio::test]
    async fn test_delete_webhook_not_ok_is_webhook_error() {
        let server = StubServer::start(vec![Route::json("/bot123:abc/deleteWebhook", r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#)]).await;
        let err = client_for(&server).delete_webhook().await.unwrap_err();
        assert!(matches!(err, Error::WebhookDisable(_)));
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_resolve_file_url() {
        let server = StubServer::start(vec![Route::json(
            "/bot123:abc/getFile",
            r#"{"ok":true,"result":{"file_id":"AwAD","file_unique_id":"u","file_size":30720,"file_path":"voice/file_1.oga"}}"#,
        )])
        .await;

        let url = client_for(&server).resolve_file_url("AwAD").await.unwrap();
        assert_eq!(url, format!("{}/file/bot123:abc/voice/file_1.oga", server.base_url));

        let request = &server.requests()[0];
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["file_id"], "AwAD");
    }

    #[tokio::test]
    async fn test_invalid_file_id_is_lookup_error() {
        let server = StubServer::start(vec![Route::json(
            "/bot123:abc/getFile",
            r#"{"ok":false,"error_code":400,"description":"Bad Request: invalid file_id"}"#,
        )])
        .await;

        let err = client_for(&server).resolve_file_url("expired").await.unwrap_err();
        assert!(matches!(err, Error::Lookup(_)));
        assert!(err.to_string().contains("invalid file_id"));
    }

    #[tokio::test]
    async fn test_send_message_failure_has_description() {
        let server = StubServer::start(vec![Route::json(
            "/bot123:abc/sendMessage",
            r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#,
        )])
        .await;

        let err = client_for(&server).send_message(1001, "hello").await.unwrap_err();
        assert_eq!(err.to_string(), "telegram sendMessage failed: Forbidden: bot was blocked by the user");
    }

    #[tokio::test]
    async fn test_get_updates_sends_offset() {
        let server = StubServer::start(vec![Route::json(
            "/bot123:abc/getUpdates",
            r#"{"ok":true,"result":[{"update_id":10,"message":{"message_id":1,"chat":{"id":5},"text":"hi"}}]}"#,
        )])
        .await;

        let updates = client_for(&server).get_updates(10, 0).await.unwrap();
        assert_eq!(updates.len(), 1);

        let body: serde_json::Value = serde_json::from_slice(&server.requests()[0].body).unwrap();
        assert_eq!(body["offset"], 10);
        assert_eq!(body["timeout"], 0);
    }

    #[tokio::test]
    async fn test_http_error_does_not_leak_token() {
        let client = BotClient { client: reqwest::Client::new(), api_url: "http://127.0.0.1:1".to_string(), token: "123:secret".to_string() };
        let err = client.send_typing(1).await.unwrap_err();
        assert!(matches!(err, Error::Http { .. }));
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_poll_request_timeout_adds_grace() {
        assert_eq!(poll_request_timeout(20), Duration::from_secs(30));
        assert_eq!(poll_request_timeout(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_split_message_short() {
        assert_eq!(split_message("hello", 4096), vec!["hello"]);
    }

    #[test]
    fn test_split_message_prefers_newlines() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = split_message(text, 8);
        assert_eq!(chunks, vec!["aaaa\n", "bbbb\n", "cccc"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_message_respects_char_boundaries() {
        let text = "ééééé"; // 2 bytes per char
        let chunks = split_message(text, 3);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.len() <= 3));
    }
}
