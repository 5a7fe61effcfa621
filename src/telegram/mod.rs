mod delivery;

pub use delivery::TelegramDeliveryChannel;

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    types::{ChatId, MessageId},
};

use crate::{
    reminder::Reminder,
    resolve::{self, ParseError},
    scheduling::ReminderScheduler,
    storage::{NewReminder, ReminderStorage},
};

type HandlerResult = anyhow::Result<()>;

const CREATE_PREFIX: &str = "!напомни";
const LIST_COMMAND: &str = "!лист";
const DELETE_PREFIX: &str = "!удалить";

const LIST_HEADER: &str = "Список напоминаний:";
const EMPTY_LIST_TEXT: &str = "Список напоминаний пуст.";
const CREATED_TEXT: &str = "Готово! ✔️";
const INVALID_FORMAT_HINT: &str = "Неверный формат. Введите событие и время/дату в формате: \"событие ЧЧ:ММ\" или \"событие ДД.MM ЧЧ:ММ\"";

const HINT_SELF_DESTRUCT: Duration = Duration::from_secs(30);
const CONFIRMATION_SELF_DESTRUCT: Duration = Duration::from_secs(15);

#[derive(Clone)]
struct CreateCommand {
    text: String,
}

#[derive(Clone)]
struct DeleteCommand {
    event: String,
}

pub struct TelegramInteractionInterface;

impl TelegramInteractionInterface {
    pub async fn start(
        bot: Bot,
        scheduler: Arc<dyn ReminderScheduler>,
        reminder_storage: Arc<dyn ReminderStorage>,
    ) {
        log::info!("Starting Telegram interaction interface");

        Dispatcher::builder(bot, schema())
            .dependencies(dptree::deps![scheduler, reminder_storage])
            // Ordinary chatter is none of our business.
            .default_handler(|_| async {})
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await
    }
}

fn schema() -> UpdateHandler<anyhow::Error> {
    Update::filter_message()
        .branch(
            dptree::filter(|msg: Message| {
                msg.text().is_some_and(|text| text.contains(LIST_COMMAND))
            })
            .endpoint(list_reminders),
        )
        .branch(
            dptree::filter_map(|msg: Message| msg.text().and_then(parse_delete_command))
                .endpoint(delete_reminder),
        )
        .branch(
            dptree::filter_map(|msg: Message| msg.text().and_then(parse_create_command))
                .endpoint(create_reminder),
        )
}

fn parse_create_command(text: &str) -> Option<CreateCommand> {
    let rest = text.strip_prefix(CREATE_PREFIX)?;
    rest.starts_with(char::is_whitespace).then(|| CreateCommand {
        text: rest.trim().to_string(),
    })
}

fn parse_delete_command(text: &str) -> Option<DeleteCommand> {
    let rest = text.strip_prefix(DELETE_PREFIX)?;
    let event = rest.trim();
    (rest.starts_with(char::is_whitespace) && !event.is_empty()).then(|| DeleteCommand {
        event: event.to_string(),
    })
}

async fn list_reminders(
    bot: Bot,
    msg: Message,
    storage: Arc<dyn ReminderStorage>,
) -> HandlerResult {
    let reminders = storage.get_all().await?;
    bot.send_message(msg.chat.id, format_reminder_list(&reminders))
        .await?;

    Ok(())
}

async fn delete_reminder(
    bot: Bot,
    msg: Message,
    command: DeleteCommand,
    storage: Arc<dyn ReminderStorage>,
    scheduler: Arc<dyn ReminderScheduler>,
) -> HandlerResult {
    let reply = match storage.find_by_event(&command.event).await? {
        Some(reminder) => {
            scheduler.cancel_reminder(reminder.id).await?;
            format!("Напоминание \"{}\" успешно удалено.", command.event)
        }
        None => format!("Напоминание \"{}\" не найдено.", command.event),
    };
    bot.send_message(msg.chat.id, reply).await?;

    Ok(())
}

async fn create_reminder(
    bot: Bot,
    msg: Message,
    command: CreateCommand,
    storage: Arc<dyn ReminderStorage>,
    scheduler: Arc<dyn ReminderScheduler>,
) -> HandlerResult {
    let resolved = match resolve::resolve(&command.text, Local::now().naive_local()) {
        Ok(resolved) => resolved,
        Err(ParseError::InvalidFormat) => {
            let hint = bot.send_message(msg.chat.id, INVALID_FORMAT_HINT).await?;
            delete_after(bot, msg.chat.id, hint.id, HINT_SELF_DESTRUCT);
            return Ok(());
        }
    };

    let confirmation = bot.send_message(msg.chat.id, CREATED_TEXT).await?;
    delete_after(
        bot.clone(),
        msg.chat.id,
        confirmation.id,
        CONFIRMATION_SELF_DESTRUCT,
    );

    let reminder = storage
        .insert(NewReminder {
            event: resolved.event,
            fire_at: resolved.fire_at,
            conversation: msg.chat.id.0,
        })
        .await?;
    log::info!(
        "Created reminder {} firing at {}",
        reminder.id,
        reminder.fire_at
    );

    scheduler.schedule_reminder(reminder).await?;
    Ok(())
}

/// Removes a service reply after a delay. Best-effort: the message may
/// already be gone or the bot may lack rights, neither blocks anything.
fn delete_after(bot: Bot, chat_id: ChatId, message_id: MessageId, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(error) = bot.delete_message(chat_id, message_id).await {
            log::warn!("Failed to delete service message {message_id:?}: {error}");
        }
    });
}

fn format_reminder_list(reminders: &[Reminder]) -> String {
    if reminders.is_empty() {
        return EMPTY_LIST_TEXT.to_string();
    }

    let mut list = String::from(LIST_HEADER);
    for reminder in reminders {
        list.push_str(&format!(
            "\n- {} ({})",
            reminder.event,
            reminder.fire_at.format("%d.%m.%Y %H:%M")
        ));
    }

    list
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn create_command_requires_whitespace_after_prefix() {
        assert_eq!(
            parse_create_command("!напомни тест 10:00").unwrap().text,
            "тест 10:00"
        );
        assert!(parse_create_command("!напомнить позже").is_none());
        assert!(parse_create_command("!напомни").is_none());
    }

    #[test]
    fn delete_command_requires_an_event() {
        assert_eq!(
            parse_delete_command("!удалить тест").unwrap().event,
            "тест"
        );
        assert!(parse_delete_command("!удалить").is_none());
        assert!(parse_delete_command("!удалить   ").is_none());
    }

    #[test]
    fn empty_list_uses_the_fixed_message() {
        assert_eq!(format_reminder_list(&[]), EMPTY_LIST_TEXT);
    }

    #[test]
    fn list_lines_carry_the_full_date() {
        let reminders = vec![
            Reminder {
                id: 1,
                event: "тест".to_string(),
                fire_at: NaiveDate::from_ymd_opt(2024, 6, 5)
                    .unwrap()
                    .and_hms_opt(9, 5, 0)
                    .unwrap(),
                conversation: 42,
            },
            Reminder {
                id: 2,
                event: "встреча".to_string(),
                fire_at: NaiveDate::from_ymd_opt(2024, 12, 31)
                    .unwrap()
                    .and_hms_opt(23, 59, 0)
                    .unwrap(),
                conversation: 42,
            },
        ];

        assert_eq!(
            format_reminder_list(&reminders),
            "Список напоминаний:\n- тест (05.06.2024 09:05)\n- встреча (31.12.2024 23:59)"
        );
    }
}
