use chrono::NaiveDateTime;

pub type ReminderId = i64;

/// Opaque handle to the chat a reminder was created in. The core only stores
/// and forwards it; the transport layer knows what it means.
pub type ConversationId = i64;

/// A pending reminder. Rows are immutable after creation: there is no
/// reschedule, a reminder is either delivered or cancelled and then removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: ReminderId,
    pub event: String,
    pub fire_at: NaiveDateTime,
    pub conversation: ConversationId,
}
