//! # routes::health
//!
//! Optional status surface, enabled with `STATUS_ADDR`.
//! ไม่ตั้งค่า = ไม่เปิด port เลย
//!
//! | Method | Path          | Description                                    |
//! |--------|---------------|------------------------------------------------|
//! | GET    | `/api/health` | Tick / alert counters, last price, subscribers |

use std::sync::atomic::Ordering;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── GET /api/health ──────────────────────────────────────────────────────────

pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let last_price = *state.last_price.read().await;

    Json(json!({
        "ok":            true,
        "tick_count":    state.tick_count.load(Ordering::Relaxed),
        "skipped_ticks": state.skipped_ticks.load(Ordering::Relaxed),
        "alert_count":   state.alert_count.load(Ordering::Relaxed),
        "subscribers":   state.registry.len().await,
        "last_price":    last_price,
    }))
}
