use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::chat_message::{ChatContext, ChatMessage};
use crate::domain::private_request::{PrivateRequest, PrivateRequestStatus};
use crate::domain::review::Review;
use crate::domain::ride::{Ride, RideStatus};
use crate::domain::user::User;
use crate::repository::errors::RepositoryError;

#[cfg_attr(test, mockall::automock)]
pub trait RideRepository: Send + Sync {
    async fn create(&self, ride: &Ride) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ride>, RepositoryError>;
    async fn list_by_status(
        &self,
        status: Option<RideStatus>,
    ) -> Result<Vec<Ride>, RepositoryError>;
    async fn list_by_driver(&self, driver_id: Uuid) -> Result<Vec<Ride>, RepositoryError>;
    /// Active rides matching the date (when given) with at least
    /// `seats_needed` seats remaining, newest-first.
    async fn search_active(
        &self,
        date: Option<NaiveDate>,
        seats_needed: i32,
    ) -> Result<Vec<Ride>, RepositoryError>;
    async fn update(&self, ride: &Ride) -> Result<(), RepositoryError>;
    async fn set_status(&self, id: Uuid, status: RideStatus) -> Result<(), RepositoryError>;
    /// Applies the seat delta as a single atomic update, guarded so that
    /// `0 <= booked_seats + delta <= available_seats` holds. Returns
    /// false when the guard rejects the delta.
    async fn adjust_booked_seats(&self, id: Uuid, delta: i32) -> Result<bool, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: &Booking) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, RepositoryError>;
    async fn list_by_passenger(&self, passenger_id: Uuid) -> Result<Vec<Booking>, RepositoryError>;
    async fn list_by_driver(&self, driver_id: Uuid) -> Result<Vec<Booking>, RepositoryError>;
    /// The passenger's pending or accepted booking on a ride, if any.
    async fn find_live_for_passenger(
        &self,
        ride_id: Uuid,
        passenger_id: Uuid,
    ) -> Result<Option<Booking>, RepositoryError>;
    /// A completed booking on the ride where the user was either side.
    async fn find_completed_for_participant(
        &self,
        ride_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Booking>, RepositoryError>;
    /// Conditional transition guarded on the current status. Returns
    /// false when the row was no longer in `from`, so the same
    /// transition can never be applied twice.
    async fn set_status_if(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, RepositoryError>;
    async fn cancel_pending_for_ride(&self, ride_id: Uuid) -> Result<u64, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait PrivateRequestRepository: Send + Sync {
    async fn create(&self, request: &PrivateRequest) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PrivateRequest>, RepositoryError>;
    async fn list_by_passenger(
        &self,
        passenger_id: Uuid,
    ) -> Result<Vec<PrivateRequest>, RepositoryError>;
    /// Active, unexpired requests from other passengers, newest-first.
    async fn list_open_excluding(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PrivateRequest>, RepositoryError>;
    /// Claims the single response slot: records the responder and the
    /// generated ride offer iff the request is still active. Returns
    /// false when another driver already claimed it.
    async fn mark_responded_if_active(
        &self,
        id: Uuid,
        responder_id: Uuid,
        ride_offer_id: Uuid,
    ) -> Result<bool, RepositoryError>;
    async fn set_status(
        &self,
        id: Uuid,
        status: PrivateRequestStatus,
    ) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ChatMessageRepository: Send + Sync {
    async fn create(&self, message: &ChatMessage) -> Result<(), RepositoryError>;
    /// Messages for the context in chronological order.
    async fn list_for_context(
        &self,
        context: ChatContext,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;
    async fn mark_read(
        &self,
        context: ChatContext,
        receiver_id: Uuid,
    ) -> Result<u64, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ReviewRepository: Send + Sync {
    async fn create(&self, review: &Review) -> Result<(), RepositoryError>;
    async fn exists(
        &self,
        ride_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
    ) -> Result<bool, RepositoryError>;
    async fn list_for_reviewee(&self, reviewee_id: Uuid) -> Result<Vec<Review>, RepositoryError>;
    /// Mean and count over the full review history addressed to the user.
    async fn aggregate_for_reviewee(
        &self,
        reviewee_id: Uuid,
    ) -> Result<(f64, i64), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    async fn set_rating_summary(
        &self,
        id: Uuid,
        rating: f64,
        total_ratings: i64,
    ) -> Result<(), RepositoryError>;
    /// Deletes the user's rides, bookings, private requests, chat
    /// messages, reviews and the user record in one transaction.
    async fn delete_account_data(&self, user_id: Uuid) -> Result<(), RepositoryError>;
}
