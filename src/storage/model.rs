use chrono::NaiveDateTime;

use crate::reminder::ConversationId;

pub struct NewReminder {
    pub event: String,
    pub fire_at: NaiveDateTime,
    pub conversation: ConversationId,
}
