use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ride::Ride;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Only pending and accepted bookings have outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Accepted)
                | (BookingStatus::Pending, BookingStatus::Rejected)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Accepted, BookingStatus::Cancelled)
                | (BookingStatus::Accepted, BookingStatus::Completed)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub passenger_name: String,
    pub driver_id: Uuid,
    pub seats: i32,
    pub message: Option<String>,
    /// Frozen at creation: seats x price_per_seat at the time of booking.
    pub total_price: f64,
    pub status: BookingStatus,
    pub pickup_location: String,
    pub drop_location: String,
    pub date: NaiveDate,
    pub time: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        passenger_id: Uuid,
        passenger_name: String,
        ride: &Ride,
        seats: i32,
        message: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ride_id: ride.id,
            passenger_id,
            passenger_name,
            driver_id: ride.driver_id,
            seats,
            message,
            total_price: seats as f64 * ride.price_per_seat,
            status: BookingStatus::Pending,
            pickup_location: ride.pickup_location.clone(),
            drop_location: ride.drop_location.clone(),
            date: ride.date,
            time: ride.time.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}
