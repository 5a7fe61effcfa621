use std::sync::Arc;

use async_trait::async_trait;

use crate::{reminder::Reminder, scheduling::ReminderWorker, storage::ReminderStorage};

/// Outbound side of a delivery: pushes the notification text to the chat a
/// reminder belongs to.
#[async_trait]
pub trait ReminderDeliveryChannel: Send + Sync + 'static {
    async fn send_reminder_notification(&self, reminder: &Reminder) -> anyhow::Result<()>;
}

/// Runs when a timer fires: re-checks the row, notifies, cleans up. The
/// notification is fire-and-forget; a reminder past its fire time has no
/// meaningful retry window.
pub struct DeliveryDispatcher {
    storage: Arc<dyn ReminderStorage>,
    channel: Arc<dyn ReminderDeliveryChannel>,
}

impl DeliveryDispatcher {
    pub fn new(storage: Arc<dyn ReminderStorage>, channel: Arc<dyn ReminderDeliveryChannel>) -> Self {
        Self { storage, channel }
    }
}

#[async_trait]
impl ReminderWorker for DeliveryDispatcher {
    async fn handle_reminder(&self, reminder: &Reminder) -> anyhow::Result<()> {
        // The row is the source of truth: a cancellation may have won the
        // race against this timer, and a cancelled reminder must not fire.
        let Some(current) = self.storage.get(reminder.id).await? else {
            log::info!("Reminder {} is gone from storage, skipping delivery", reminder.id);
            return Ok(());
        };

        if let Err(error) = self.channel.send_reminder_notification(&current).await {
            log::error!("Failed to deliver reminder {}: {error:#}", current.id);
        }

        self.storage.delete(current.id).await?;
        Ok(())
    }
}
