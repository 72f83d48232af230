//! # notifier — Alert fan-out
//!
//! ส่งแจ้งเตือนไปยังผู้ติดตามทุกคนพร้อมกัน
//!
//! Best effort: each subscriber gets its own `sendMessage`, a failure is
//! logged and counted, and the rest still go out.

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::models::{AlertEvent, ChatId};
use crate::telegram::Messenger;

/// Outcome of one fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed:    usize,
}

/// Fixed alert template, two-decimal precision.
pub fn format_alert(instrument_name: &str, event: &AlertEvent) -> String {
    let arrow = if event.is_rise() { "📈" } else { "📉" };

    format!(
        "⚠️ Sharp price spike!\n\
         Instrument: {instrument_name}\n\
         Old price: {previous:.2}\n\
         New price: {current:.2}\n\
         Change: {arrow} {change:.2}%",
        previous = event.previous,
        current  = event.current,
        change   = event.change_pct,
    )
}

pub struct Notifier<'a> {
    messenger:       &'a dyn Messenger,
    instrument_name: &'a str,
}

impl<'a> Notifier<'a> {
    pub fn new(messenger: &'a dyn Messenger, instrument_name: &'a str) -> Self {
        Self { messenger, instrument_name }
    }

    /// Send `event` to every chat in `subscribers`.  Never fails.
    pub async fn notify(&self, event: &AlertEvent, subscribers: &[ChatId]) -> DeliveryReport {
        if subscribers.is_empty() {
            info!(alert_id = %event.alert_id, "Spike detected but nobody is subscribed");
            return DeliveryReport::default();
        }

        let text = format_alert(self.instrument_name, event);

        let results = join_all(
            subscribers
                .iter()
                .map(|&chat_id| self.messenger.send_message(chat_id, &text)),
        )
        .await;

        let mut report = DeliveryReport::default();
        for result in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(alert_id = %event.alert_id, error = %e, "Alert delivery failed");
                }
            }
        }

        info!(
            alert_id  = %event.alert_id,
            delivered = report.delivered,
            failed    = report.failed,
            "📨 Alert fan-out finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every send; fails for chats in `broken`.
    #[derive(Default)]
    struct FakeMessenger {
        broken: Vec<ChatId>,
        sent:   Mutex<Vec<(ChatId, String)>>,
    }

    #[async_trait]
    impl Messenger for FakeMessenger {
        async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), AppError> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            if self.broken.contains(&chat_id) {
                return Err(AppError::DeliveryFailed { chat_id, reason: "blocked".into() });
            }
            Ok(())
        }
    }

    fn event() -> AlertEvent {
        AlertEvent::new("BBG004730N88", 100.0, 103.0, 3.0)
    }

    #[test]
    fn test_format_alert() {
        let text = format_alert("SBER", &event());

        assert!(text.starts_with("⚠️ Sharp price spike!"));
        assert!(text.contains("Instrument: SBER"));
        assert!(text.contains("Old price: 100.00"));
        assert!(text.contains("New price: 103.00"));
        assert!(text.contains("Change: 📈 3.00%"));
    }

    #[test]
    fn test_format_alert_drop() {
        let event = AlertEvent::new("X", 271.355, 265.9, 2.0102);
        let text = format_alert("SBER", &event);
        assert!(text.contains("New price: 265.90"));
        assert!(text.contains("Change: 📉 2.01%"));
    }

    #[tokio::test]
    async fn test_failure_does_not_block_others() {
        let messenger = FakeMessenger { broken: vec![1], ..Default::default() };
        let notifier = Notifier::new(&messenger, "SBER");

        let report = notifier.notify(&event(), &[1, 2, 3]).await;

        assert_eq!(report, DeliveryReport { delivered: 2, failed: 1 });
        let sent = messenger.sent.lock().unwrap();
        let chats: Vec<ChatId> = sent.iter().map(|(c, _)| *c).collect();
        assert_eq!(chats, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_same_text() {
        let messenger = FakeMessenger::default();
        let notifier = Notifier::new(&messenger, "SBER");

        notifier.notify(&event(), &[10, 20]).await;

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, sent[1].1);
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let messenger = FakeMessenger::default();
        let report = Notifier::new(&messenger, "SBER").notify(&event(), &[]).await;

        assert_eq!(report, DeliveryReport::default());
        assert!(messenger.sent.lock().unwrap().is_empty());
    }
}
