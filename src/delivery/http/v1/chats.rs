use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::delivery::http::v1::middleware::AuthenticatedUser;
use crate::domain::chat_message::{ChatContext, ChatMessage};
use crate::usecase::error::UsecaseError;
use crate::AppState;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    Booking,
    Request,
}

impl ContextType {
    fn into_context(self, id: Uuid) -> ChatContext {
        match self {
            ContextType::Booking => ChatContext::Booking(id),
            ContextType::Request => ChatContext::Request(id),
        }
    }
}

#[derive(Serialize)]
pub struct ChatMessageResponse {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub receiver_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate)]
pub struct SendMessageRequest {
    pub context_type: ContextType,
    pub context_id: Uuid,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

fn message_to_response(message: ChatMessage) -> ChatMessageResponse {
    ChatMessageResponse {
        id: message.id,
        booking_id: message.booking_id,
        request_id: message.request_id,
        sender_id: message.sender_id,
        sender_name: message.sender_name,
        receiver_id: message.receiver_id,
        content: message.content,
        read: message.read,
        created_at: message.created_at,
    }
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling send chat message request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(user_id = %user.user_id, ?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(format!("{:?}", validation_errors)));
    }

    let context = payload.context_type.into_context(payload.context_id);
    let message = state
        .chats_usecase
        .send_message(user.user_id, user.display_name, context, payload.content)
        .await?;

    metrics::counter!("chat_messages_sent_total").increment(1);

    tracing::debug!(message_id = %message.id, "chat message sent successfully");
    Ok((StatusCode::CREATED, Json(message_to_response(message))))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id, ?context_type, context_id = %context_id))]
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((context_type, context_id)): Path<(ContextType, Uuid)>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling get chat messages request");

    let context = context_type.into_context(context_id);
    let messages = state.chats_usecase.fetch_messages(user.user_id, context).await?;
    let response: Vec<ChatMessageResponse> =
        messages.into_iter().map(message_to_response).collect();

    tracing::debug!(count = response.len(), "chat messages retrieved successfully");
    Ok((StatusCode::OK, Json(response)))
}
