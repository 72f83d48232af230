//! # scheduler — Spike Loop
//!
//! วนลูปทุก N วินาที: ดึงราคา → ตรวจ Spike → แจ้งเตือน
//!
//! ## Flow
//! ```text
//! every POLL_INTERVAL_SECS (first tick immediately):
//!   1. Fetch latest 1m candle close        (skip tick on failure / no data)
//!   2. SpikeDetector::evaluate
//!   3. On spike → Notifier fan-out to every subscriber
//! ```
//!
//! A tick runs to completion before the next one starts.  If a tick overruns
//! the period the following tick is delayed rather than fired in a burst.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::engine::detector::DetectorState;
use crate::engine::SpikeDetector;
use crate::market::{fetch_last_price, MarketData};
use crate::models::AlertEvent;
use crate::notifier::{DeliveryReport, Notifier};
use crate::state::SharedState;
use crate::telegram::Messenger;

/// What one tick ended with.
#[derive(Debug, PartialEq)]
pub enum TickOutcome {
    /// Fetch failed or the window held no candles; detector untouched.
    Skipped,
    Baseline,
    Quiet,
    Alerted { event: AlertEvent, report: DeliveryReport },
    /// Detector could not compare (zero baseline).
    DetectorError,
}

pub struct SpikeLoop<'a> {
    pub market:          &'a dyn MarketData,
    pub messenger:       &'a dyn Messenger,
    pub state:           SharedState,
    pub detector:        SpikeDetector,
    pub figi:            String,
    pub instrument_name: String,
    pub lookback:        chrono::Duration,
}

impl<'a> SpikeLoop<'a> {
    /// fetch → evaluate → notify, once.
    pub async fn tick(&mut self) -> TickOutcome {
        let sample = match fetch_last_price(self.market, &self.figi, self.lookback).await {
            Ok(Some(sample)) => sample,
            Ok(None) => {
                info!(figi = %self.figi, "No candles in lookback window — tick skipped");
                self.state.record_skip();
                return TickOutcome::Skipped;
            }
            Err(e) => {
                warn!(figi = %self.figi, error = %e, "Price fetch failed — tick skipped");
                self.state.record_skip();
                return TickOutcome::Skipped;
            }
        };

        self.state.record_price(sample).await;
        let was_baseline = self.detector.state() == DetectorState::AwaitingBaseline;

        let event = match self.detector.evaluate(sample.price) {
            Ok(Some(event)) => event,
            Ok(None) if was_baseline => return TickOutcome::Baseline,
            Ok(None) => return TickOutcome::Quiet,
            Err(e) => {
                warn!(figi = %self.figi, error = %e, "Detector rejected sample");
                return TickOutcome::DetectorError;
            }
        };

        self.state.record_alert();

        let subscribers = self.state.registry.list().await;
        let report = Notifier::new(self.messenger, &self.instrument_name)
            .notify(&event, &subscribers)
            .await;

        TickOutcome::Alerted { event, report }
    }

    /// Tick every `period` until `shutdown` flips to `true`.
    pub async fn run(mut self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            figi      = %self.figi,
            threshold = self.detector.threshold_percent(),
            period    = ?period,
            "⏱️ Spike loop started"
        );

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            let outcome = tokio::select! {
                outcome = self.tick() => outcome,
                _ = shutdown.changed() => break,
            };

            if let TickOutcome::Alerted { event, report } = &outcome {
                info!(
                    alert_id  = %event.alert_id,
                    delivered = report.delivered,
                    failed    = report.failed,
                    "Tick raised an alert"
                );
            }
        }

        info!("⏱️ Spike loop stopped");
    }
}
