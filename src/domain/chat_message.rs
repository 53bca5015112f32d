use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The relationship a chat thread is scoped to. The counterpart is
/// resolved from the live booking/request state on every send, never
/// stored as a fixed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatContext {
    Booking(Uuid),
    Request(Uuid),
}

impl ChatContext {
    pub fn booking_id(&self) -> Option<Uuid> {
        match self {
            ChatContext::Booking(id) => Some(*id),
            ChatContext::Request(_) => None,
        }
    }

    pub fn request_id(&self) -> Option<Uuid> {
        match self {
            ChatContext::Booking(_) => None,
            ChatContext::Request(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub request_id: Option<Uuid>,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub receiver_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        context: ChatContext,
        sender_id: Uuid,
        sender_name: String,
        receiver_id: Uuid,
        content: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: context.booking_id(),
            request_id: context.request_id(),
            sender_id,
            sender_name,
            receiver_id,
            content,
            read: false,
            created_at: Utc::now(),
        }
    }
}
