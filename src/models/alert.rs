//! # models::alert
//!
//! [`AlertEvent`] lives only between the detector and the notifier.
//! ไม่มีการบันทึกลง DB

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    /// Correlates the detector log line with the per-subscriber delivery logs.
    pub alert_id:    Uuid,
    pub figi:        String,
    pub previous:    f64,
    pub current:     f64,
    /// Absolute change, always >= 0
    pub change_pct:  f64,
    pub detected_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(figi: &str, previous: f64, current: f64, change_pct: f64) -> Self {
        Self {
            alert_id:    Uuid::new_v4(),
            figi:        figi.to_string(),
            previous,
            current,
            change_pct,
            detected_at: Utc::now(),
        }
    }

    #[inline]
    pub fn is_rise(&self) -> bool {
        self.current > self.previous
    }
}
