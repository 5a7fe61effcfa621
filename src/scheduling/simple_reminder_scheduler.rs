use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeDelta};
use tokio::{
    sync::{RwLock, watch},
    task::{self, JoinHandle},
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    reminder::{Reminder, ReminderId},
    storage::ReminderStorage,
};

use super::{ReminderScheduler, ReminderWorker, ScheduledReminder};

const CANCEL_TIMEOUT: Duration = Duration::from_secs(5);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

struct ScheduledTask {
    task_handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl ScheduledTask {
    fn new(task_handle: JoinHandle<()>, cancellation_token: CancellationToken) -> Self {
        Self {
            task_handle,
            cancellation_token,
        }
    }

    async fn cancel(self, timeout: Duration) {
        self.cancellation_token.cancel();
        let _ = time::timeout(timeout, self.task_handle).await;
    }
}

struct CleanupTask(watch::Sender<()>);

type ReminderTaskStore = RwLock<HashMap<ReminderId, ScheduledTask>>;

/// One spawned tokio task per armed reminder, keyed by reminder id so a
/// cancellation can find the right timer. Fired tasks leave a finished
/// handle behind; a periodic cleanup task purges those.
pub struct SimpleReminderScheduler {
    tasks: Arc<ReminderTaskStore>,
    worker: Arc<dyn ReminderWorker>,
    storage: Arc<dyn ReminderStorage>,
    cleanup_task: CleanupTask,
}

impl SimpleReminderScheduler {
    pub fn new(worker: Arc<dyn ReminderWorker>, storage: Arc<dyn ReminderStorage>) -> Self {
        let tasks = Arc::new(RwLock::new(HashMap::new()));
        let cleanup_task = Self::spawn_cleanup_task(Arc::clone(&tasks));

        Self {
            tasks,
            worker,
            storage,
            cleanup_task,
        }
    }

    fn create_reminder_task(&self, reminder: Reminder) -> ScheduledTask {
        let reminder_id = reminder.id;
        let cancellation_token = CancellationToken::new();
        let task_token = cancellation_token.child_token();
        let worker = Arc::clone(&self.worker);

        let delay = get_target_delay(reminder.fire_at, Local::now().naive_local())
            .to_std()
            .expect("The delay is clamped to be non-negative.");
        log::info!("Arming reminder {reminder_id}, firing in {delay:?}");

        let task_handle = task::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {
                    log::info!("Timer for reminder {reminder_id} was cancelled");
                }
                _ = time::sleep(delay) => {
                    if let Err(error) = worker.handle_reminder(&reminder).await {
                        log::error!("Delivery for reminder {reminder_id} failed: {error:#}");
                    }
                }
            }
        });

        ScheduledTask::new(task_handle, cancellation_token)
    }

    fn spawn_cleanup_task(tasks: Arc<ReminderTaskStore>) -> CleanupTask {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());
        task::spawn(async move {
            loop {
                tokio::select! {
                    _ = time::sleep(CLEANUP_INTERVAL) => {
                        Self::clean_finished_tasks(&tasks).await;
                    }
                    _ = shutdown_rx.changed() => {
                        log::info!("Cleanup task shutting down");
                        break;
                    }
                };
            }
        });

        CleanupTask(shutdown_tx)
    }

    async fn clean_finished_tasks(tasks: &ReminderTaskStore) {
        let mut tasks = tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, handle| !handle.task_handle.is_finished());
        let after = tasks.len();

        if before != after {
            log::info!("Cleaned up {} fired reminder timers", before - after);
        }
    }
}

impl Drop for SimpleReminderScheduler {
    fn drop(&mut self) {
        let _ = self.cleanup_task.0.send(());
    }
}

#[async_trait]
impl ReminderScheduler for SimpleReminderScheduler {
    async fn schedule_reminder(&self, reminder: Reminder) -> anyhow::Result<ScheduledReminder> {
        let reminder_id = reminder.id;
        let mut tasks = self.tasks.write().await;
        match tasks.entry(reminder_id) {
            Entry::Occupied(_) => anyhow::bail!("Reminder {reminder_id} is already scheduled"),
            Entry::Vacant(e) => {
                e.insert(self.create_reminder_task(reminder));
                Ok(ScheduledReminder { id: reminder_id })
            }
        }
    }

    async fn cancel_reminder(&self, id: ReminderId) -> anyhow::Result<()> {
        // The row goes first: once it is gone, a timer firing concurrently
        // finds nothing to deliver. A failed delete surfaces to the caller
        // and leaves the timer armed, keeping the pre-cancel state.
        self.storage.delete(id).await?;

        let task = self.tasks.write().await.remove(&id);
        if let Some(task) = task {
            task.cancel(CANCEL_TIMEOUT).await;
        }

        Ok(())
    }

    async fn reconcile_pending(&self) -> anyhow::Result<usize> {
        let reminders = self.storage.get_all().await?;
        let mut armed = 0;
        for reminder in reminders {
            let reminder_id = reminder.id;
            match self.schedule_reminder(reminder).await {
                Ok(_) => armed += 1,
                Err(error) => {
                    log::debug!("Skipping reminder {reminder_id} during reconciliation: {error}")
                }
            }
        }

        log::info!("Reconciliation armed {armed} reminders");
        Ok(armed)
    }
}

pub(crate) fn get_target_delay(fire_at: NaiveDateTime, now: NaiveDateTime) -> TimeDelta {
    // A fire time that already passed collapses to zero: late delivery is
    // preferred over a silent drop.
    (fire_at - now).max(TimeDelta::zero())
}
