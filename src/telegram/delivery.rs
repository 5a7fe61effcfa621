use async_trait::async_trait;
use teloxide::{prelude::*, types::ChatId};

use crate::{delivery::ReminderDeliveryChannel, reminder::Reminder};

pub struct TelegramDeliveryChannel {
    bot: Bot,
}

impl TelegramDeliveryChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ReminderDeliveryChannel for TelegramDeliveryChannel {
    async fn send_reminder_notification(&self, reminder: &Reminder) -> anyhow::Result<()> {
        self.bot
            .send_message(
                ChatId(reminder.conversation),
                format!("Напоминаю: {}", reminder.event),
            )
            .await?;

        Ok(())
    }
}
