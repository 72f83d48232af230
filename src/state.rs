//! # state
//!
//! ตัวนับสถานะรวมของ daemon (อ่านจาก /api/health)
//!
//! Runtime counters shared between the scheduler (writes) and the status
//! route (reads), plus the subscriber registry handle.
//!
//! Price state itself is *not* here: the previous price belongs to the
//! detector inside the scheduler task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::PriceSample;
use crate::registry::SubscriberRegistry;

// ─── AppState ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct AppState {
    pub registry: SubscriberRegistry,

    /// Ticks that produced a price and reached the detector.
    pub tick_count: AtomicU64,

    /// Ticks dropped because the fetch failed or the window was empty.
    pub skipped_ticks: AtomicU64,

    /// Spikes detected this session.  Monotonically increasing.
    pub alert_count: AtomicU64,

    /// Last price seen, for the status route only.
    pub last_price: RwLock<Option<PriceSample>>,
}

impl AppState {
    pub fn new(registry: SubscriberRegistry) -> Self {
        Self { registry, ..Default::default() }
    }

    pub async fn record_price(&self, sample: PriceSample) {
        self.tick_count.fetch_add(1, Ordering::Relaxed);
        *self.last_price.write().await = Some(sample);
    }

    pub fn record_skip(&self) {
        self.skipped_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert(&self) {
        self.alert_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;

pub fn build_state(registry: SubscriberRegistry) -> SharedState {
    Arc::new(AppState::new(registry))
}
