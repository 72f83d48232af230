//! # market — Price Fetcher
//!
//! ดึง Candle ล่าสุดจาก Tinkoff Invest แล้วสรุปเป็นราคาเดียว
//!
//! ## Endpoint
//! `POST {base}/tinkoff.public.invest.api.contract.v1.MarketDataService/GetCandles`
//!
//! ```json
//! { "figi": "BBG004730N88", "from": "...Z", "to": "...Z", "interval": "CANDLE_INTERVAL_1_MIN" }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Candle, PriceSample};

const GET_CANDLES_PATH: &str =
    "/tinkoff.public.invest.api.contract.v1.MarketDataService/GetCandles";

/// Bar granularity requested from the gateway.
pub const ONE_MINUTE: &str = "CANDLE_INTERVAL_1_MIN";

// ─── Seam ─────────────────────────────────────────────────────────────────────

/// Anything that can return the candles of one instrument for a time range.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn get_candles(
        &self,
        figi: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, AppError>;
}

/// Return the close of the most recent candle in `[now - lookback, now]`.
///
/// `Ok(None)` means the window was empty (market closed, instrument halted).
pub async fn fetch_last_price(
    source: &dyn MarketData,
    figi: &str,
    lookback: chrono::Duration,
) -> Result<Option<PriceSample>, AppError> {
    let to = Utc::now();
    let from = to.checked_sub_signed(lookback).ok_or_else(|| {
        AppError::FetchUnavailable(format!("lookback {lookback} reaches outside the calendar"))
    })?;
    let candles = source.get_candles(figi, from, to).await?;

    debug!(figi, candles = candles.len(), "Candles fetched");

    Ok(latest_close(&candles))
}

/// Latest by bar time, not by position in the response.
pub fn latest_close(candles: &[Candle]) -> Option<PriceSample> {
    candles
        .iter()
        .max_by_key(|c| c.time)
        .map(PriceSample::from)
}

// ─── Tinkoff Invest REST ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct GetCandlesRequest<'a> {
    figi:     &'a str,
    from:     DateTime<Utc>,
    to:       DateTime<Utc>,
    interval: &'a str,
}

#[derive(Deserialize)]
struct GetCandlesResponse {
    #[serde(default)]
    candles: Vec<Candle>,
}

pub struct TinkoffClient {
    client:   reqwest::Client,
    base_url: String,
    token:    String,
}

impl TinkoffClient {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.tinkoff_api_url.clone(),
            token:    config.tinkoff_token.clone(),
        }
    }
}

#[async_trait]
impl MarketData for TinkoffClient {
    async fn get_candles(
        &self,
        figi: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, AppError> {
        let url = format!("{}{GET_CANDLES_PATH}", self.base_url);
        let body = GetCandlesRequest { figi, from, to, interval: ONE_MINUTE };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| AppError::FetchUnavailable(format!("Tinkoff unreachable: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::FetchUnavailable(format!("Tinkoff HTTP {status}: {text}")));
        }

        let data: GetCandlesResponse = resp
            .json()
            .await
            .map_err(|e| AppError::FetchUnavailable(format!("Tinkoff response parse error: {e}")))?;

        Ok(data.candles)
    }
}
