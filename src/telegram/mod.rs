//! Telegram chat transport.
//!
//! Provides the Bot API client and the `ChatTransport` trait the dispatcher drives.

mod client;
mod transport;
mod types;

pub use client::BotClient;
pub use transport::ChatTransport;
pub use types::{Message, Update};

#[cfg(test)]
pub use types::{Chat, Voice};
