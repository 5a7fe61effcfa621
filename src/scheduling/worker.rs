use async_trait::async_trait;

use crate::reminder::Reminder;

/// What the scheduler runs when a reminder's timer fires.
#[async_trait]
pub trait ReminderWorker: Send + Sync + 'static {
    async fn handle_reminder(&self, reminder: &Reminder) -> anyhow::Result<()>;
}
