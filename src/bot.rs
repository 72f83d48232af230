//! # bot — Inbound command poller
//!
//! รับคำสั่งจาก Telegram แบบ long-poll แล้ว route ตาม command.
//! Only `/start` does anything: it subscribes the chat and replies with a
//! fixed confirmation.
//!
//! In group chats Telegram appends the target bot, e.g. `/start@SpikeWatchBot`.
//! A command addressed to another bot is ignored.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::ChatId;
use crate::registry::SubscriberRegistry;
use crate::telegram::{Messenger, Update, UpdateSource};

pub const START_REPLY: &str =
    "Bot started! You will receive notifications about sharp price spikes.";

/// Pause after a failed `getUpdates` so a dead network does not spin the loop.
const ERROR_PAUSE: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
}

impl Command {
    /// `/start` and `/start payload` always count.  `/start@Name` counts only
    /// when `Name` is `own_username` (case-insensitive, as Telegram does).
    pub fn parse(text: &str, own_username: Option<&str>) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let word = word.strip_prefix('/')?;

        let name = match word.split_once('@') {
            None => word,
            Some((name, target)) => match own_username {
                Some(me) if target.eq_ignore_ascii_case(me) => name,
                // ของบอทตัวอื่น หรือเรายังไม่รู้ชื่อตัวเอง
                _ => return None,
            },
        };

        match name {
            "start" => Some(Command::Start),
            _ => None,
        }
    }
}

/// Handle one update.  Returns the chat that was newly subscribed, if any.
pub async fn handle_update(
    update: &Update,
    registry: &SubscriberRegistry,
    messenger: &dyn Messenger,
    own_username: Option<&str>,
) -> Option<ChatId> {
    let message = update.message.as_ref()?;
    let text = message.text.as_deref()?;
    let chat_id = message.chat.id;

    match Command::parse(text, own_username) {
        Some(Command::Start) => {
            let is_new = registry.register(chat_id).await;
            info!(chat_id, is_new, "👋 /start received — chat subscribed");

            if let Err(e) = messenger.send_message(chat_id, START_REPLY).await {
                warn!(chat_id, error = %e, "Could not send /start confirmation");
            }
            is_new.then_some(chat_id)
        }
        None => {
            debug!(chat_id, "Ignoring non-command message");
            None
        }
    }
}

/// Poll until `shutdown` flips to `true`.
///
/// `own_username` comes from `getMe`; `None` means addressed commands
/// (`/start@Name`) are all ignored.
pub async fn run<B>(
    bot: &B,
    registry: SubscriberRegistry,
    own_username: Option<String>,
    mut shutdown: watch::Receiver<bool>,
) where
    B: UpdateSource + Messenger,
{
    let mut offset = 0_i64;
    info!(username = ?own_username, "🤖 Command poller started");

    while !*shutdown.borrow() {
        let polled = tokio::select! {
            polled = bot.get_updates(offset) => polled,
            _ = shutdown.changed() => break,
        };

        match polled {
            Ok(updates) => {
                for update in &updates {
                    // acknowledge even if handling bails out early
                    offset = offset.max(update.update_id + 1);
                    handle_update(update, &registry, bot, own_username.as_deref()).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "getUpdates failed — polling again shortly");
                tokio::select! {
                    _ = tokio::time::sleep(ERROR_PAUSE) => {}
                    _ = shutdown.changed() => break,
                }
            }
        }
    }

    info!("🤖 Command poller stopped");
}
