use uuid::Uuid;

use crate::domain::booking::BookingStatus;
use crate::domain::chat_message::{ChatContext, ChatMessage};
use crate::domain::private_request::PrivateRequestStatus;
use crate::usecase::contracts::{BookingRepository, ChatMessageRepository, PrivateRequestRepository};
use crate::usecase::error::UsecaseError;

pub struct ChatsUseCase<C, B, P>
where
    C: ChatMessageRepository,
    B: BookingRepository,
    P: PrivateRequestRepository,
{
    chat_repository: C,
    booking_repository: B,
    request_repository: P,
}

impl<C, B, P> ChatsUseCase<C, B, P>
where
    C: ChatMessageRepository,
    B: BookingRepository,
    P: PrivateRequestRepository,
{
    pub fn new(chat_repository: C, booking_repository: B, request_repository: P) -> Self {
        Self {
            chat_repository,
            booking_repository,
            request_repository,
        }
    }

    /// Computes the receiver from the current booking/request state on
    /// every send. The counterpart is never persisted as a relationship.
    async fn resolve_counterpart(
        &self,
        sender_id: Uuid,
        context: ChatContext,
    ) -> Result<Uuid, UsecaseError> {
        match context {
            ChatContext::Booking(booking_id) => {
                let booking = self
                    .booking_repository
                    .find_by_id(booking_id)
                    .await?
                    .ok_or_else(|| UsecaseError::NotFound("Booking".to_string()))?;

                if !matches!(
                    booking.status,
                    BookingStatus::Pending | BookingStatus::Accepted
                ) {
                    return Err(UsecaseError::InvalidState(
                        "Cannot chat on this booking".to_string(),
                    ));
                }

                if sender_id == booking.driver_id {
                    Ok(booking.passenger_id)
                } else if sender_id == booking.passenger_id {
                    Ok(booking.driver_id)
                } else {
                    tracing::warn!(%booking_id, "chat attempt by non-participant");
                    Err(UsecaseError::Forbidden("Not authorized".to_string()))
                }
            }
            ChatContext::Request(request_id) => {
                let request = self
                    .request_repository
                    .find_by_id(request_id)
                    .await?
                    .ok_or_else(|| UsecaseError::NotFound("Request".to_string()))?;

                if !matches!(
                    request.status,
                    PrivateRequestStatus::Active | PrivateRequestStatus::Responded
                ) {
                    return Err(UsecaseError::InvalidState(
                        "Cannot chat on this request".to_string(),
                    ));
                }

                if sender_id == request.passenger_id {
                    request.responded_by.ok_or_else(|| {
                        UsecaseError::InvalidState("No chat partner available".to_string())
                    })
                } else if request.responded_by == Some(sender_id) {
                    Ok(request.passenger_id)
                } else {
                    tracing::warn!(%request_id, "chat attempt by non-participant");
                    Err(UsecaseError::Forbidden("Not authorized".to_string()))
                }
            }
        }
    }

    #[tracing::instrument(skip(self, sender_name, content), fields(sender_id = %sender_id))]
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        sender_name: String,
        context: ChatContext,
        content: String,
    ) -> Result<ChatMessage, UsecaseError> {
        tracing::debug!("sending chat message");

        let receiver_id = self.resolve_counterpart(sender_id, context).await?;

        let message = ChatMessage::new(context, sender_id, sender_name, receiver_id, content);
        self.chat_repository.create(&message).await?;

        tracing::debug!(message_id = %message.id, %receiver_id, "chat message sent");
        Ok(message)
    }

    /// Returns the thread in chronological order and, as a side effect,
    /// marks every message addressed to the requester as read.
    #[tracing::instrument(skip(self), fields(requester_id = %requester_id))]
    pub async fn fetch_messages(
        &self,
        requester_id: Uuid,
        context: ChatContext,
    ) -> Result<Vec<ChatMessage>, UsecaseError> {
        tracing::debug!("fetching chat messages");

        let messages = self.chat_repository.list_for_context(context).await?;
        let marked = self
            .chat_repository
            .mark_read(context, requester_id)
            .await?;

        tracing::debug!(count = messages.len(), marked, "chat messages fetched");
        Ok(messages)
    }
}
