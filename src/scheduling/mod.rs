mod simple_reminder_scheduler;
mod worker;

pub use simple_reminder_scheduler::SimpleReminderScheduler;
pub use worker::ReminderWorker;

use async_trait::async_trait;

use crate::reminder::{Reminder, ReminderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledReminder {
    pub id: ReminderId,
}

/// Owns one timer per pending reminder and hands fired reminders to the
/// worker. The storage stays the source of truth; the timer set is
/// reconciled against it, never the other way around.
#[async_trait]
pub trait ReminderScheduler: Send + Sync {
    async fn schedule_reminder(&self, reminder: Reminder) -> anyhow::Result<ScheduledReminder>;

    async fn cancel_reminder(&self, id: ReminderId) -> anyhow::Result<()>;

    /// Arms a timer for every stored reminder that has none. In-memory
    /// timers do not survive a restart, so this must run at startup before
    /// new commands are accepted. Returns the number of timers armed.
    async fn reconcile_pending(&self) -> anyhow::Result<usize>;
}
