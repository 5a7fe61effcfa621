use std::sync::Arc;

use teloxide::Bot;

use napomni::{
    appsettings,
    delivery::DeliveryDispatcher,
    scheduling::{ReminderScheduler, SimpleReminderScheduler},
    storage::{InMemoryReminderStorage, ReminderStorage},
    telegram::{TelegramDeliveryChannel, TelegramInteractionInterface},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = appsettings::get();
    let bot = Bot::new(settings.telegram.token.clone());

    let storage: Arc<dyn ReminderStorage> = Arc::new(InMemoryReminderStorage::new());
    let channel = Arc::new(TelegramDeliveryChannel::new(bot.clone()));
    let dispatcher = Arc::new(DeliveryDispatcher::new(Arc::clone(&storage), channel));
    let scheduler = Arc::new(SimpleReminderScheduler::new(dispatcher, Arc::clone(&storage)));

    let armed = scheduler.reconcile_pending().await?;
    log::info!("Re-armed {armed} pending reminders");

    TelegramInteractionInterface::start(bot, scheduler, storage).await;

    Ok(())
}
