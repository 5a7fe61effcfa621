mod model;
mod reminder_storage;

pub use model::NewReminder;
pub use reminder_storage::{InMemoryReminderStorage, ReminderStorage, StorageError};
