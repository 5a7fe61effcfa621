use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::reminder::{Reminder, ReminderId};

use super::NewReminder;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage write failed: {0}")]
    WriteFailed(String),

    #[error("storage read failed: {0}")]
    ReadFailed(String),
}

/// Passive ledger of pending reminders. The store never schedules anything
/// itself; the scheduler reconciles its timer set against it.
#[async_trait]
pub trait ReminderStorage: Send + Sync {
    /// Inserts a new row and assigns it the next id.
    async fn insert(&self, reminder: NewReminder) -> Result<Reminder, StorageError>;

    /// Idempotent: deleting an id that is already gone is a no-op, so the
    /// cancel path and the fire path may race to it.
    async fn delete(&self, id: ReminderId) -> Result<(), StorageError>;

    async fn get(&self, id: ReminderId) -> Result<Option<Reminder>, StorageError>;

    /// Exact match on the event text. When several rows share a name, the
    /// one with the lowest id is returned.
    async fn find_by_event(&self, event: &str) -> Result<Option<Reminder>, StorageError>;

    /// All pending rows in insertion order.
    async fn get_all(&self) -> Result<Vec<Reminder>, StorageError>;
}

struct InMemoryState {
    next_id: ReminderId,
    rows: BTreeMap<ReminderId, Reminder>,
}

pub struct InMemoryReminderStorage {
    store: RwLock<InMemoryState>,
}

impl InMemoryReminderStorage {
    pub fn new() -> Self {
        InMemoryReminderStorage {
            store: RwLock::new(InMemoryState {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }
}

impl Default for InMemoryReminderStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReminderStorage for InMemoryReminderStorage {
    async fn insert(&self, reminder: NewReminder) -> Result<Reminder, StorageError> {
        let mut store = self.store.write().await;
        let id = store.next_id;
        store.next_id += 1;

        let row = Reminder {
            id,
            event: reminder.event,
            fire_at: reminder.fire_at,
            conversation: reminder.conversation,
        };
        store.rows.insert(id, row.clone());

        log::info!("Inserted reminder {id}");
        Ok(row)
    }

    async fn delete(&self, id: ReminderId) -> Result<(), StorageError> {
        let mut store = self.store.write().await;
        if store.rows.remove(&id).is_some() {
            log::info!("Deleted reminder {id}");
        }
        Ok(())
    }

    async fn get(&self, id: ReminderId) -> Result<Option<Reminder>, StorageError> {
        let store = self.store.read().await;
        Ok(store.rows.get(&id).cloned())
    }

    async fn find_by_event(&self, event: &str) -> Result<Option<Reminder>, StorageError> {
        let store = self.store.read().await;
        Ok(store.rows.values().find(|r| r.event == event).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Reminder>, StorageError> {
        let store = self.store.read().await;
        Ok(store.rows.values().cloned().collect())
    }
}
