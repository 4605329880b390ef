//! Application configuration and CLI argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Voice transcriber bot configuration.
///
/// Every option can also be provided through the environment, which is how the
/// tokens are normally supplied.
#[derive(Parser, Debug, Clone)]
#[command(name = "voice-transcriber-bot")]
#[command(author, version, about = "A Telegram bot that transcribes voice messages", long_about = None)]
pub struct AppConfig {
    /// Telegram Bot API token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_token: String,

    /// Wit.ai server access token
    #[arg(long, env = "WIT_AI_TOKEN", hide_env_values = true)]
    pub wit_token: String,

    /// Telegram Bot API base URL (override for a self-hosted Bot API server)
    #[arg(long, env = "TELEGRAM_API_URL", default_value = "https://api.telegram.org")]
    pub telegram_api_url: String,

    /// Wit.ai API base URL
    #[arg(long, env = "WIT_API_URL", default_value = "https://api.wit.ai")]
    pub wit_api_url: String,

    /// Wit.ai API version (date string sent as the `v` query parameter)
    #[arg(long, env = "WIT_API_VERSION", default_value = "20240304")]
    pub wit_api_version: String,

    /// Seconds to wait between update polls
    #[arg(long, env = "POLL_INTERVAL", default_value = "1")]
    pub poll_interval: u64,

    /// Long-poll timeout in seconds for getUpdates (0 = short polling)
    #[arg(long, env = "POLL_TIMEOUT", default_value = "20")]
    pub poll_timeout: u64,

    /// Directory for downloaded and converted voice files
    #[arg(long, short = 't', env = "TEMP_DIR", default_value_os_t = std::env::temp_dir())]
    pub temp_dir: PathBuf,

    /// Path to the ffmpeg executable
    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    pub ffmpeg_path: PathBuf,

    /// Timeout in seconds for downloading a voice file
    #[arg(long, env = "DOWNLOAD_TIMEOUT", default_value = "60")]
    pub download_timeout: u64,

    /// Timeout in seconds for converting a voice file
    #[arg(long, env = "TRANSCODE_TIMEOUT", default_value = "60")]
    pub transcode_timeout: u64,

    /// Timeout in seconds for the speech recognition request
    #[arg(long, env = "RECOGNITION_TIMEOUT", default_value = "30")]
    pub recognition_timeout: u64,

    /// Enable verbose logging
    #[arg(long, short = 'v', env = "VERBOSE")]
    pub verbose: bool,
}

impl AppConfig {
    /// Parse configuration from command line arguments and environment.
    pub fn from_args() -> Self {
        let mut config = Self::parse();
        config.normalize_urls();
        config
    }

    /// Strip trailing slashes so endpoint paths can be appended directly.
    fn normalize_urls(&mut self) {
        self.telegram_api_url = self.telegram_api_url.trim_end_matches('/').to_string();
        self.wit_api_url = self.wit_api_url.trim_end_matches('/').to_string();
    }

    /// Delay between two poll cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Bound on a single voice download.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout)
    }

    /// Bound on a single ffmpeg run.
    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout)
    }

    /// Bound on a single recognition request.
    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_secs(self.recognition_timeout)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.telegram_token.trim().is_empty() {
            anyhow::bail!("Telegram bot token is empty");
        }

        if self.wit_token.trim().is_empty() {
            anyhow::bail!("Wit.ai token is empty");
        }

        if !self.temp_dir.is_dir() {
            anyhow::bail!("Temp directory does not exist or is not a directory: {}", self.temp_dir.display());
        }

        if self.download_timeout == 0 || self.transcode_timeout == 0 || self.recognition_timeout == 0 {
            anyhow::bail!("Timeouts must be at least one second");
        }

        Ok(())
    }

    /// Log the current configuration (tokens are masked).
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Telegram API: {}", self.telegram_api_url);
        info!("  Telegram token: {}", mask_token(&self.telegram_token));
        info!("  Wit.ai API: {} (v={})", self.wit_api_url, self.wit_api_version);
        info!("  Wit.ai token: {}", mask_token(&self.wit_token));
        info!("  Poll interval: {}s, long-poll timeout: {}s", self.poll_interval, self.poll_timeout);
        info!("  Temp directory: {}", self.temp_dir.display());
        info!("  ffmpeg: {}", self.ffmpeg_path.display());
        info!(
            "  Timeouts: download={}s, transcode={}s, recognition={}s",
            self.download_timeout, self.transcode_timeout, self.recognition_timeout
        );
    }
}

/// Keep only the last four characters of a secret.
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
