//! # models::candle
//!
//! Defines [`Candle`], the one-minute OHLC bar returned by Tinkoff Invest
//! `MarketDataService/GetCandles`, and [`PriceSample`], the single scalar the
//! rest of the daemon works with.
//!
//! Prices arrive as a [`Quotation`]: whole units plus billionths.  The REST
//! gateway encodes `units` (an `int64`) as a JSON string, so both forms are
//! accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Fixed-point price: `units + nano / 1e9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotation {
    #[serde(deserialize_with = "int64_from_json")]
    pub units: i64,
    #[serde(default)]
    pub nano:  i32,
}

impl Quotation {
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.units as f64 + self.nano as f64 / 1e9
    }
}

/// A single one-minute candle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub open:  Quotation,
    pub high:  Quotation,
    pub low:   Quotation,
    pub close: Quotation,

    /// Lots traded within the bar.
    #[serde(default, deserialize_with = "int64_from_json")]
    pub volume: i64,

    /// Bar open time (UTC).
    pub time: DateTime<Utc>,

    /// `false` for the bar that is still forming.
    #[serde(default)]
    pub is_complete: bool,
}

/// The scalar price derived from the latest candle close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSample {
    pub price: f64,
    pub time:  DateTime<Utc>,
}

impl From<&Candle> for PriceSample {
    fn from(candle: &Candle) -> Self {
        Self {
            price: candle.close.to_f64(),
            time:  candle.time,
        }
    }
}

fn int64_from_json<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(i64),
        Text(String),
    }

    match Int64::deserialize(deserializer)? {
        Int64::Number(n) => Ok(n),
        Int64::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
