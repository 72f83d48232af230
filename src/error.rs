//! # error
//!
//! Centralised application error type.
//! ใช้ thiserror เหมือนกันทั้งโปรเจกต์
//!
//! Only the configuration variants are fatal.  Everything the scheduler or the
//! bot poller produces at steady state is logged where it happens and the loop
//! carries on with the next round.

use thiserror::Error;

use crate::models::ChatId;

#[derive(Debug, Error)]
pub enum AppError {
    /// Market-data call failed (network, HTTP status, or unparsable body).
    #[error("Market data unavailable: {0}")]
    FetchUnavailable(String),

    /// `sendMessage` to a single subscriber failed.
    #[error("Delivery to chat {chat_id} failed: {reason}")]
    DeliveryFailed { chat_id: ChatId, reason: String },

    /// Telegram `getUpdates` failed.
    #[error("Bot API error: {0}")]
    BotApi(String),

    /// A required variable is absent at startup.
    #[error("Missing configuration: {0} environment variable is required")]
    ConfigMissing(&'static str),

    /// A variable is present but cannot be used.
    #[error("Invalid configuration for {key}: {reason}")]
    ConfigInvalid { key: &'static str, reason: String },

    /// The held baseline price is zero, percent change is undefined.
    #[error("Cannot compute percent change from a zero baseline (current price {current})")]
    DivideByZeroPrice { current: f64 },
}
