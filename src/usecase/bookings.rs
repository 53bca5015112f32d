use uuid::Uuid;

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::ride::RideStatus;
use crate::usecase::contracts::{BookingRepository, RideRepository};
use crate::usecase::error::UsecaseError;

pub struct BookingsUseCase<B, R>
where
    B: BookingRepository,
    R: RideRepository,
{
    booking_repository: B,
    ride_repository: R,
}

impl<B, R> BookingsUseCase<B, R>
where
    B: BookingRepository,
    R: RideRepository,
{
    pub fn new(booking_repository: B, ride_repository: R) -> Self {
        Self {
            booking_repository,
            ride_repository,
        }
    }

    /// The availability check here is advisory: the authoritative guard
    /// is the atomic seat increment at accept time.
    #[tracing::instrument(skip(self, message), fields(passenger_id = %passenger_id, ride_id = %ride_id, seats))]
    pub async fn create_booking(
        &self,
        passenger_id: Uuid,
        passenger_name: String,
        ride_id: Uuid,
        seats: i32,
        message: Option<String>,
    ) -> Result<Booking, UsecaseError> {
        tracing::debug!("creating booking");

        let ride = self
            .ride_repository
            .find_by_id(ride_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Ride".to_string()))?;

        if ride.driver_id == passenger_id {
            return Err(UsecaseError::Validation(
                "Cannot book your own ride".to_string(),
            ));
        }

        if ride.status != RideStatus::Active {
            return Err(UsecaseError::InvalidState("Ride is not active".to_string()));
        }

        let remaining = ride.seats_remaining();
        if seats > remaining {
            return Err(UsecaseError::CapacityExceeded(format!(
                "Only {} seats available",
                remaining
            )));
        }

        if self
            .booking_repository
            .find_live_for_passenger(ride_id, passenger_id)
            .await?
            .is_some()
        {
            return Err(UsecaseError::Conflict(
                "You already have a booking for this ride".to_string(),
            ));
        }

        let booking = Booking::new(passenger_id, passenger_name, &ride, seats, message);
        self.booking_repository.create(&booking).await.map_err(|e| {
            match UsecaseError::from(e) {
                // The live-booking unique index fired under a race.
                UsecaseError::Conflict(_) => UsecaseError::Conflict(
                    "You already have a booking for this ride".to_string(),
                ),
                other => other,
            }
        })?;

        tracing::info!(booking_id = %booking.id, "booking created");
        Ok(booking)
    }

    #[tracing::instrument(skip(self), fields(passenger_id = %passenger_id))]
    pub async fn my_bookings(&self, passenger_id: Uuid) -> Result<Vec<Booking>, UsecaseError> {
        tracing::debug!("listing passenger bookings");

        let bookings = self
            .booking_repository
            .list_by_passenger(passenger_id)
            .await?;

        tracing::debug!(count = bookings.len(), "passenger bookings listed");
        Ok(bookings)
    }

    #[tracing::instrument(skip(self), fields(driver_id = %driver_id))]
    pub async fn booking_requests(&self, driver_id: Uuid) -> Result<Vec<Booking>, UsecaseError> {
        tracing::debug!("listing booking requests for driver");

        let bookings = self.booking_repository.list_by_driver(driver_id).await?;

        tracing::debug!(count = bookings.len(), "driver booking requests listed");
        Ok(bookings)
    }

    /// Drives the booking state machine. Seat capacity moves exactly on
    /// pending->accepted (+seats) and accepted->cancelled (-seats); both
    /// the status flip and the seat delta are conditional single-row
    /// updates, so a lost race is an error, never a double adjustment.
    #[tracing::instrument(skip(self), fields(requester_id = %requester_id, booking_id = %booking_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        requester_id: Uuid,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> Result<Booking, UsecaseError> {
        tracing::debug!("updating booking status");

        let mut booking = self
            .booking_repository
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Booking".to_string()))?;

        let is_driver = booking.driver_id == requester_id;
        let is_passenger = booking.passenger_id == requester_id;
        if !is_driver && !is_passenger {
            tracing::warn!("booking status change by non-participant");
            return Err(UsecaseError::Forbidden("Not authorized".to_string()));
        }

        let current = booking.status;
        if current.is_terminal() {
            return Err(UsecaseError::InvalidState(format!(
                "Booking is already {}",
                current
            )));
        }
        if !current.can_transition_to(new_status) {
            return Err(UsecaseError::InvalidState(format!(
                "Invalid status transition from {} to {}",
                current, new_status
            )));
        }

        match new_status {
            BookingStatus::Accepted | BookingStatus::Rejected if !is_driver => {
                return Err(UsecaseError::Forbidden(
                    "Only the driver can accept or reject".to_string(),
                ));
            }
            _ => {}
        }

        let claimed = self
            .booking_repository
            .set_status_if(booking_id, current, new_status)
            .await?;
        if !claimed {
            return Err(UsecaseError::Conflict(
                "Booking status changed concurrently".to_string(),
            ));
        }

        if current == BookingStatus::Pending && new_status == BookingStatus::Accepted {
            let applied = self
                .ride_repository
                .adjust_booked_seats(booking.ride_id, booking.seats)
                .await?;
            if !applied {
                // Capacity filled between the claim and the increment:
                // put the booking back to pending and refuse the accept.
                let reverted = self
                    .booking_repository
                    .set_status_if(booking_id, BookingStatus::Accepted, BookingStatus::Pending)
                    .await?;
                if !reverted {
                    self.reconcile_lost_revert(booking_id, &booking).await?;
                }
                return Err(UsecaseError::CapacityExceeded(
                    "Not enough seats remaining to accept this booking".to_string(),
                ));
            }
        }

        if current == BookingStatus::Accepted && new_status == BookingStatus::Cancelled {
            let applied = self
                .ride_repository
                .adjust_booked_seats(booking.ride_id, -booking.seats)
                .await?;
            if !applied {
                tracing::error!(
                    ride_id = %booking.ride_id,
                    seats = booking.seats,
                    "seat release rejected, ride capacity is inconsistent"
                );
                return Err(UsecaseError::Internal(
                    "Failed to release booked seats".to_string(),
                ));
            }
        }

        booking.status = new_status;
        booking.updated_at = chrono::Utc::now();

        tracing::info!(%booking_id, from = %current, to = %new_status, "booking status updated");
        Ok(booking)
    }

    /// Runs when the accept revert finds the booking no longer accepted:
    /// a concurrent transition consumed the claimed state. If that
    /// transition was a cancel, it also released seats this accept never
    /// added, and those seats must go back on the ride.
    async fn reconcile_lost_revert(
        &self,
        booking_id: Uuid,
        booking: &Booking,
    ) -> Result<(), UsecaseError> {
        let current = self
            .booking_repository
            .find_by_id(booking_id)
            .await?
            .map(|b| b.status);

        match current {
            Some(BookingStatus::Cancelled) => {
                let restored = self
                    .ride_repository
                    .adjust_booked_seats(booking.ride_id, booking.seats)
                    .await?;
                if !restored {
                    tracing::error!(
                        %booking_id,
                        ride_id = %booking.ride_id,
                        seats = booking.seats,
                        "could not restore seats released by a concurrent cancel"
                    );
                }
            }
            status => {
                tracing::error!(
                    %booking_id,
                    ride_id = %booking.ride_id,
                    ?status,
                    "booking left the accepted state before the revert landed"
                );
            }
        }

        Ok(())
    }
}
