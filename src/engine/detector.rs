//! # engine::detector
//!
//! **Spike Detector** — runs once per scheduler tick.
//! เทียบราคาปัจจุบันกับราคาของ Tick ก่อนหน้าเท่านั้น
//!
//! ```text
//!   AwaitingBaseline ──first sample──▶ Tracking { previous }
//!                                         │   ▲
//!                                         └───┘  every later sample
//! ```
//!
//! The comparison is always against the sample from the tick before.  There
//! is no smoothing and no debounce: two qualifying ticks in a row raise two
//! alerts.

use tracing::{debug, info};

use crate::error::AppError;
use crate::models::AlertEvent;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorState {
    /// No price observed yet
    AwaitingBaseline,
    Tracking { previous: f64 },
}

#[derive(Debug)]
pub struct SpikeDetector {
    figi:              String,
    threshold_percent: f64,
    state:             DetectorState,
}

impl SpikeDetector {
    pub fn new(figi: impl Into<String>, threshold_percent: f64) -> Self {
        Self {
            figi: figi.into(),
            threshold_percent,
            state: DetectorState::AwaitingBaseline,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn threshold_percent(&self) -> f64 {
        self.threshold_percent
    }

    /// Feed the current price.
    ///
    /// Returns `Some(event)` when `|current - previous| / previous * 100`
    /// reaches the threshold (inclusive).  The baseline always moves to
    /// `current`, also when a zero baseline makes the change undefined.
    pub fn evaluate(&mut self, current: f64) -> Result<Option<AlertEvent>, AppError> {
        let previous = match std::mem::replace(
            &mut self.state,
            DetectorState::Tracking { previous: current },
        ) {
            DetectorState::AwaitingBaseline => {
                info!(figi = %self.figi, price = current, "Baseline established");
                return Ok(None);
            }
            DetectorState::Tracking { previous } => previous,
        };

        if previous == 0.0 {
            return Err(AppError::DivideByZeroPrice { current });
        }

        let change_pct = percent_change(previous, current);

        if change_pct >= self.threshold_percent {
            info!(
                figi      = %self.figi,
                previous,
                current,
                change_pct,
                threshold = self.threshold_percent,
                "📈 Spike detected"
            );
            return Ok(Some(AlertEvent::new(&self.figi, previous, current, change_pct)));
        }

        debug!(previous, current, change_pct, "Below threshold");
        Ok(None)
    }
}

/// Absolute percent change.  Caller guarantees `previous != 0`.
#[inline]
pub fn percent_change(previous: f64, current: f64) -> f64 {
    // multiply first so round numbers stay exact (100 → 98 is exactly 2.0)
    (current - previous).abs() * 100.0 / previous.abs()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
