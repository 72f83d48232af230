//! Domain models shared across the daemon.

pub mod alert;
pub mod candle;

pub use alert::AlertEvent;
pub use candle::{Candle, PriceSample};

/// Telegram chat identifier of a subscriber.
pub type ChatId = i64;
