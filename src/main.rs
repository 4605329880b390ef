//! Voice Transcriber Bot - relays Telegram voice messages to Wit.ai.
//!
//! Each voice message is downloaded, downmixed to mono MP3 with ffmpeg, sent to
//! Wit.ai for speech recognition, and the recognized text is sent back to the chat.

mod config;
mod dispatcher;
mod error;
mod pipeline;
mod recognition;
mod scratch;
mod telegram;
mod transcode;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use config::AppConfig;
use dispatcher::Dispatcher;
use pipeline::VoicePipeline;
use recognition::WitClient;
use telegram::BotClient;

/// Wait for a shutdown signal (Ctrl+C or SIGTERM) and cancel the token.
async fn wait_for_shutdown(shutdown: CancellationToken) {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("🛑 Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("🛑 Received SIGTERM, shutting down...");
        }
    }

    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let config = AppConfig::from_args();

    // Respect RUST_LOG env var, fallback to verbose flag, default to info
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| if config.verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") })
        .context("Invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("🎙️ Voice Transcriber Bot v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }
    config.log_config();

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    let bot = BotClient::new(http.clone(), &config);
    let me = bot.get_me().await.context("Failed to authorize with the Telegram Bot API")?;
    info!("🤖 Authorized as @{} ({})", me.username.as_deref().unwrap_or("unknown"), me.first_name);

    let pipeline = VoicePipeline::new(http.clone(), &config, WitClient::new(http, &config));
    let dispatcher = Dispatcher::new(bot, pipeline, &config);

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    // Webhook removal failure is fatal: nothing is polled in that case
    dispatcher.run(shutdown).await.context("Failed to start polling")?;

    info!("✅ Voice transcriber bot stopped");
    Ok(())
}
