//! # spikewatch — Price Spike Alert Daemon
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────┐  GetCandles (1m)   ┌──────────────────┐   sendMessage   ┌────────────┐
//!  │ Tinkoff      │ ◀───────────────── │  Spike Loop      │ ──────────────▶ │ Subscribers│
//!  │ Invest REST  │                    │  fetch→evaluate  │                 │ (Telegram) │
//!  └──────────────┘                    │  →notify         │                 └────────────┘
//!                                      └────────▲─────────┘                        │
//!                                               │ list()                           │ /start
//!                                      ┌────────┴─────────┐   getUpdates           │
//!                                      │ SubscriberRegistry│ ◀──── Command Poller ◀─┘
//!                                      └──────────────────┘
//! ```
//!
//! Everything runs as futures joined on the main task; nothing is spawned.
//!
//! ## Environment Variables
//!
//! | Variable             | Default                                     | Description                  |
//! |----------------------|---------------------------------------------|------------------------------|
//! | `TINKOFF_TOKEN`      | —                                           | Market-data token (required) |
//! | `TELEGRAM_TOKEN`     | —                                           | Bot token (required)         |
//! | `FIGI`               | `BBG004730N88`                              | Instrument to watch          |
//! | `INSTRUMENT_NAME`    | `SBER`                                      | Name shown in alerts         |
//! | `THRESHOLD_PERCENT`  | `2.0`                                       | Spike threshold (inclusive)  |
//! | `POLL_INTERVAL_SECS` | `60`                                        | Tick period                  |
//! | `LOOKBACK_MINUTES`   | `5`                                         | Candle window per tick       |
//! | `TINKOFF_API_URL`    | `https://invest-public-api.tinkoff.ru/rest` | REST gateway                 |
//! | `TELEGRAM_API_URL`   | `https://api.telegram.org`                  | Bot API                      |
//! | `STATUS_ADDR`        | unset                                       | Enables `GET /api/health`    |
//! | `RUST_LOG`           | `spikewatch=debug`                          | Tracing filter               |

use std::net::SocketAddr;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod bot;
mod config;
mod engine;
mod error;
mod market;
mod models;
mod notifier;
mod registry;
mod routes;
mod scheduler;
mod state;
mod telegram;

use config::Config;
use engine::SpikeDetector;
use market::TinkoffClient;
use registry::SubscriberRegistry;
use scheduler::SpikeLoop;
use state::build_state;
use telegram::TelegramBot;

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("spikewatch=debug".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════╗
  ║   SPIKEWATCH — Price Spike Alerts         ║
  ║   Tinkoff Invest  ·  Telegram             ║
  ╚═══════════════════════════════════════════╝"#);

    // ── 3. Config (missing tokens are fatal) ──────────────────────────────────
    let config = Config::from_env().context("Failed to load config")?;

    info!(
        figi       = %config.figi,
        instrument = %config.instrument_name,
        threshold  = config.threshold_percent,
        interval   = ?config.poll_interval,
        "Spikewatch starting"
    );

    // ── 4. Clients & shared state ─────────────────────────────────────────────
    // ใช้ reqwest::Client ตัวเดียวร่วมกัน (connection pool เดียว)
    let http = reqwest::Client::new();
    let market = TinkoffClient::new(http.clone(), &config);
    let telegram_bot = TelegramBot::new(http, &config);

    // ชื่อบอทใช้กรอง /start@OtherBot ในกลุ่ม; ถ้า getMe ล้มเหลวก็ยังรันต่อได้
    let bot_username = match telegram_bot.get_me().await {
        Ok(me) => {
            info!(username = ?me.username, "🤖 Telegram bot identified");
            me.username
        }
        Err(e) => {
            warn!(error = %e, "getMe failed — addressed commands (/start@name) will be ignored");
            None
        }
    };

    let registry = SubscriberRegistry::new();
    let state = build_state(registry.clone());

    // ── 5. Status route (bind now so a bad address fails startup) ────────────
    let status_listener = match config.status_addr.as_deref() {
        Some(raw) => {
            let addr: SocketAddr = raw.parse().context("STATUS_ADDR must be host:port")?;
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind status route on {addr}"))?;
            info!(?addr, "🚀 Status route listening");
            Some(listener)
        }
        None => None,
    };

    // ── 6. Loops ──────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let spike_loop = SpikeLoop {
        market:          &market,
        messenger:       &telegram_bot,
        state:           state.clone(),
        detector:        SpikeDetector::new(config.figi.clone(), config.threshold_percent),
        figi:            config.figi.clone(),
        instrument_name: config.instrument_name.clone(),
        lookback:        config.lookback,
    };

    let signal = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("🛑 Ctrl-C received — shutting down"),
            Err(e) => error!(error = %e, "Could not listen for Ctrl-C — shutting down"),
        }
        let _ = shutdown_tx.send(true);
    };

    let (_, _, status, _) = tokio::join!(
        spike_loop.run(config.poll_interval, shutdown_rx.clone()),
        bot::run(&telegram_bot, registry, bot_username, shutdown_rx.clone()),
        serve_status(status_listener, state, shutdown_rx),
        signal,
    );
    status?;

    info!("Spikewatch stopped");
    Ok(())
}

/// Serve `GET /api/health` until shutdown.  No-op without a listener.
///
/// A failure is logged right away; the error itself only reaches `main`
/// once the other loops have stopped.
async fn serve_status(
    listener: Option<tokio::net::TcpListener>,
    state: state::SharedState,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let Some(listener) = listener else {
        return Ok(());
    };

    axum::serve(listener, routes::health::router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .inspect_err(|e| error!(error = %e, "❌ Status server failed — health route is down"))
        .context("Status server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_serve_status_without_listener_is_noop() {
        let (_tx, rx) = watch::channel(false);
        let state = build_state(SubscriberRegistry::new());

        assert!(serve_status(None, state, rx).await.is_ok());
    }

    #[tokio::test]
    async fn test_serve_status_answers_then_stops_on_shutdown() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = build_state(SubscriberRegistry::new());
        let (tx, rx) = watch::channel(false);

        let server = serve_status(Some(listener), state, rx);
        let client = async {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /api/health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let mut raw = String::new();
            stream.read_to_string(&mut raw).await.unwrap();
            tx.send(true).unwrap();
            raw
        };
        let (served, raw) = tokio::join!(server, client);

        assert!(served.is_ok());
        assert!(raw.starts_with("HTTP/1.1 200"), "unexpected response: {raw}");
        assert!(raw.contains("\"ok\":true"));
    }
}
