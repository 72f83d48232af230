//! # registry
//!
//! **Subscriber Registry** — chats that sent `/start`.
//! เก็บ chat_id ไว้ใน memory อย่างเดียว รีสตาร์ทแล้วหาย
//!
//! The bot poller writes, the scheduler reads.  The lock is held only for the
//! insert or the snapshot copy, never across a network call.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::ChatId;

/// Cheap to clone; all clones share one set.
#[derive(Debug, Clone, Default)]
pub struct SubscriberRegistry {
    chats: Arc<RwLock<BTreeSet<ChatId>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.  Returns `true` if the chat was not subscribed before.
    pub async fn register(&self, chat_id: ChatId) -> bool {
        self.chats.write().await.insert(chat_id)
    }

    /// Snapshot for fan-out, ascending by chat id.
    pub async fn list(&self) -> Vec<ChatId> {
        self.chats.read().await.iter().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.chats.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = SubscriberRegistry::new();

        assert!(registry.register(42).await);
        assert!(!registry.register(42).await);

        assert_eq!(registry.list().await, vec![42]);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let registry = SubscriberRegistry::new();
        let handle = registry.clone();

        handle.register(7).await;
        handle.register(-100123).await;

        assert_eq!(registry.list().await, vec![-100123, 7]);
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let registry = SubscriberRegistry::new();
        assert!(registry.list().await.is_empty());
    }
}
