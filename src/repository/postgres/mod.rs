use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    domain::booking::{Booking, BookingStatus},
    domain::chat_message::{ChatContext, ChatMessage},
    domain::private_request::{PrivateRequest, PrivateRequestStatus},
    domain::review::Review,
    domain::ride::{Ride, RideStatus},
    domain::user::User,
    repository::errors::RepositoryError,
    usecase::contracts::{
        BookingRepository, ChatMessageRepository, PrivateRequestRepository, ReviewRepository,
        RideRepository, UserRepository,
    },
};

const UNIQUE_VIOLATION: &str = "23505";

fn map_db_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return RepositoryError::Conflict;
        }
    }
    RepositoryError::DatabaseError(e.to_string())
}

pub struct PostgresRideRepository {
    pool: PgPool,
}

impl PostgresRideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RIDE_COLUMNS: &str = "id, driver_id, driver_name, pickup_location, pickup_lat, pickup_lng, \
     drop_location, drop_lat, drop_lng, date, time, available_seats, booked_seats, \
     price_per_seat, status, from_private_request, notes, created_at, updated_at";

impl RideRepository for PostgresRideRepository {
    #[tracing::instrument(skip(self, ride), fields(ride_id = %ride.id, driver_id = %ride.driver_id))]
    async fn create(&self, ride: &Ride) -> Result<(), RepositoryError> {
        tracing::debug!("creating ride");

        sqlx::query(
            r#"
            INSERT INTO rides (id, driver_id, driver_name, pickup_location, pickup_lat, pickup_lng,
                               drop_location, drop_lat, drop_lng, date, time, available_seats,
                               booked_seats, price_per_seat, status, from_private_request, notes,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(ride.id)
        .bind(ride.driver_id)
        .bind(&ride.driver_name)
        .bind(&ride.pickup_location)
        .bind(ride.pickup_lat)
        .bind(ride.pickup_lng)
        .bind(&ride.drop_location)
        .bind(ride.drop_lat)
        .bind(ride.drop_lng)
        .bind(ride.date)
        .bind(&ride.time)
        .bind(ride.available_seats)
        .bind(ride.booked_seats)
        .bind(ride.price_per_seat)
        .bind(ride.status)
        .bind(ride.from_private_request)
        .bind(&ride.notes)
        .bind(ride.created_at)
        .bind(ride.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        tracing::debug!(ride_id = %ride.id, "ride created successfully");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(ride_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ride>, RepositoryError> {
        tracing::debug!("finding ride by id");

        let query = format!("SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1");
        let ride = sqlx::query_as::<_, Ride>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(ride)
    }

    #[tracing::instrument(skip(self), fields(?status))]
    async fn list_by_status(
        &self,
        status: Option<RideStatus>,
    ) -> Result<Vec<Ride>, RepositoryError> {
        tracing::debug!("listing rides by status");

        let query = format!(
            r#"
            SELECT {RIDE_COLUMNS} FROM rides
            WHERE ($1::ride_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#
        );
        let rides = sqlx::query_as::<_, Ride>(&query)
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = rides.len(), "listed rides");
        Ok(rides)
    }

    #[tracing::instrument(skip(self), fields(driver_id = %driver_id))]
    async fn list_by_driver(&self, driver_id: Uuid) -> Result<Vec<Ride>, RepositoryError> {
        tracing::debug!("listing rides by driver");

        let query = format!(
            r#"
            SELECT {RIDE_COLUMNS} FROM rides
            WHERE driver_id = $1
            ORDER BY created_at DESC
            "#
        );
        let rides = sqlx::query_as::<_, Ride>(&query)
            .bind(driver_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(driver_id = %driver_id, count = rides.len(), "listed driver rides");
        Ok(rides)
    }

    #[tracing::instrument(skip(self), fields(?date, %seats_needed))]
    async fn search_active(
        &self,
        date: Option<NaiveDate>,
        seats_needed: i32,
    ) -> Result<Vec<Ride>, RepositoryError> {
        tracing::debug!("searching active rides");

        let query = format!(
            r#"
            SELECT {RIDE_COLUMNS} FROM rides
            WHERE status = 'active'
              AND ($1::date IS NULL OR date = $1)
              AND available_seats - booked_seats >= $2
            ORDER BY created_at DESC
            "#
        );
        let rides = sqlx::query_as::<_, Ride>(&query)
            .bind(date)
            .bind(seats_needed)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = rides.len(), "searched active rides");
        Ok(rides)
    }

    #[tracing::instrument(skip(self, ride), fields(ride_id = %ride.id))]
    async fn update(&self, ride: &Ride) -> Result<(), RepositoryError> {
        tracing::debug!("updating ride");

        let result = sqlx::query(
            r#"
            UPDATE rides
            SET available_seats = $2, price_per_seat = $3, status = $4, notes = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(ride.id)
        .bind(ride.available_seats)
        .bind(ride.price_per_seat)
        .bind(ride.status)
        .bind(&ride.notes)
        .bind(ride.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::debug!(ride_id = %ride.id, "ride updated successfully");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(ride_id = %id, %status))]
    async fn set_status(&self, id: Uuid, status: RideStatus) -> Result<(), RepositoryError> {
        tracing::debug!("setting ride status");

        let result = sqlx::query(
            r#"
            UPDATE rides
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::debug!(ride_id = %id, "ride status set successfully");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(ride_id = %id, %delta))]
    async fn adjust_booked_seats(&self, id: Uuid, delta: i32) -> Result<bool, RepositoryError> {
        tracing::debug!("adjusting booked seats");

        // Single guarded update, no read-modify-write. The guard keeps
        // booked_seats within [0, available_seats] under concurrency.
        let result = sqlx::query(
            r#"
            UPDATE rides
            SET booked_seats = booked_seats + $2, updated_at = NOW()
            WHERE id = $1
              AND booked_seats + $2 >= 0
              AND booked_seats + $2 <= available_seats
            "#,
        )
        .bind(id)
        .bind(delta)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let applied = result.rows_affected() > 0;
        tracing::debug!(ride_id = %id, delta, applied, "seat adjustment finished");
        Ok(applied)
    }
}

pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, ride_id, passenger_id, passenger_name, driver_id, seats, \
     message, total_price, status, pickup_location, drop_location, date, time, created_at, \
     updated_at";

impl BookingRepository for PostgresBookingRepository {
    #[tracing::instrument(skip(self, booking), fields(booking_id = %booking.id, ride_id = %booking.ride_id, passenger_id = %booking.passenger_id))]
    async fn create(&self, booking: &Booking) -> Result<(), RepositoryError> {
        tracing::debug!("creating booking");

        sqlx::query(
            r#"
            INSERT INTO bookings (id, ride_id, passenger_id, passenger_name, driver_id, seats,
                                  message, total_price, status, pickup_location, drop_location,
                                  date, time, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(booking.id)
        .bind(booking.ride_id)
        .bind(booking.passenger_id)
        .bind(&booking.passenger_name)
        .bind(booking.driver_id)
        .bind(booking.seats)
        .bind(&booking.message)
        .bind(booking.total_price)
        .bind(booking.status)
        .bind(&booking.pickup_location)
        .bind(&booking.drop_location)
        .bind(booking.date)
        .bind(&booking.time)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        tracing::debug!(booking_id = %booking.id, "booking created successfully");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(booking_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, RepositoryError> {
        tracing::debug!("finding booking by id");

        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self), fields(passenger_id = %passenger_id))]
    async fn list_by_passenger(&self, passenger_id: Uuid) -> Result<Vec<Booking>, RepositoryError> {
        tracing::debug!("listing bookings by passenger");

        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE passenger_id = $1
            ORDER BY created_at DESC
            "#
        );
        let bookings = sqlx::query_as::<_, Booking>(&query)
            .bind(passenger_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = bookings.len(), "listed passenger bookings");
        Ok(bookings)
    }

    #[tracing::instrument(skip(self), fields(driver_id = %driver_id))]
    async fn list_by_driver(&self, driver_id: Uuid) -> Result<Vec<Booking>, RepositoryError> {
        tracing::debug!("listing bookings by driver");

        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE driver_id = $1
            ORDER BY created_at DESC
            "#
        );
        let bookings = sqlx::query_as::<_, Booking>(&query)
            .bind(driver_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = bookings.len(), "listed driver bookings");
        Ok(bookings)
    }

    #[tracing::instrument(skip(self), fields(ride_id = %ride_id, passenger_id = %passenger_id))]
    async fn find_live_for_passenger(
        &self,
        ride_id: Uuid,
        passenger_id: Uuid,
    ) -> Result<Option<Booking>, RepositoryError> {
        tracing::debug!("finding live booking for passenger");

        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE ride_id = $1 AND passenger_id = $2 AND status IN ('pending', 'accepted')
            "#
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(ride_id)
            .bind(passenger_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self), fields(ride_id = %ride_id, user_id = %user_id))]
    async fn find_completed_for_participant(
        &self,
        ride_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Booking>, RepositoryError> {
        tracing::debug!("finding completed booking for participant");

        let query = format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE ride_id = $1 AND status = 'completed'
              AND (passenger_id = $2 OR driver_id = $2)
            LIMIT 1
            "#
        );
        let booking = sqlx::query_as::<_, Booking>(&query)
            .bind(ride_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self), fields(booking_id = %id, %from, %to))]
    async fn set_status_if(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, RepositoryError> {
        tracing::debug!("claiming booking status transition");

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let claimed = result.rows_affected() > 0;
        tracing::debug!(booking_id = %id, claimed, "transition claim finished");
        Ok(claimed)
    }

    #[tracing::instrument(skip(self), fields(ride_id = %ride_id))]
    async fn cancel_pending_for_ride(&self, ride_id: Uuid) -> Result<u64, RepositoryError> {
        tracing::debug!("cancelling pending bookings for ride");

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'cancelled', updated_at = NOW()
            WHERE ride_id = $1 AND status = 'pending'
            "#,
        )
        .bind(ride_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(ride_id = %ride_id, cancelled = result.rows_affected(), "pending bookings cancelled");
        Ok(result.rows_affected())
    }
}

pub struct PostgresPrivateRequestRepository {
    pool: PgPool,
}

impl PostgresPrivateRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const REQUEST_COLUMNS: &str = "id, passenger_id, passenger_name, from_location, from_lat, \
     from_lng, to_location, to_lat, to_lng, preferred_date, preferred_time, seats_needed, \
     message, status, responded_by, ride_offer_id, expires_at, created_at, updated_at";

impl PrivateRequestRepository for PostgresPrivateRequestRepository {
    #[tracing::instrument(skip(self, request), fields(request_id = %request.id, passenger_id = %request.passenger_id))]
    async fn create(&self, request: &PrivateRequest) -> Result<(), RepositoryError> {
        tracing::debug!("creating private request");

        sqlx::query(
            r#"
            INSERT INTO private_requests (id, passenger_id, passenger_name, from_location,
                                          from_lat, from_lng, to_location, to_lat, to_lng,
                                          preferred_date, preferred_time, seats_needed, message,
                                          status, responded_by, ride_offer_id, expires_at,
                                          created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(request.id)
        .bind(request.passenger_id)
        .bind(&request.passenger_name)
        .bind(&request.from_location)
        .bind(request.from_lat)
        .bind(request.from_lng)
        .bind(&request.to_location)
        .bind(request.to_lat)
        .bind(request.to_lng)
        .bind(request.preferred_date)
        .bind(&request.preferred_time)
        .bind(request.seats_needed)
        .bind(&request.message)
        .bind(request.status)
        .bind(request.responded_by)
        .bind(request.ride_offer_id)
        .bind(request.expires_at)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(request_id = %request.id, "private request created successfully");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(request_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PrivateRequest>, RepositoryError> {
        tracing::debug!("finding private request by id");

        let query = format!("SELECT {REQUEST_COLUMNS} FROM private_requests WHERE id = $1");
        let request = sqlx::query_as::<_, PrivateRequest>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(request)
    }

    #[tracing::instrument(skip(self), fields(passenger_id = %passenger_id))]
    async fn list_by_passenger(
        &self,
        passenger_id: Uuid,
    ) -> Result<Vec<PrivateRequest>, RepositoryError> {
        tracing::debug!("listing private requests by passenger");

        let query = format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM private_requests
            WHERE passenger_id = $1
            ORDER BY created_at DESC
            "#
        );
        let requests = sqlx::query_as::<_, PrivateRequest>(&query)
            .bind(passenger_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = requests.len(), "listed passenger requests");
        Ok(requests)
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn list_open_excluding(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PrivateRequest>, RepositoryError> {
        tracing::debug!("listing open private requests");

        let query = format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM private_requests
            WHERE status = 'active' AND passenger_id <> $1 AND expires_at > $2
            ORDER BY created_at DESC
            "#
        );
        let requests = sqlx::query_as::<_, PrivateRequest>(&query)
            .bind(user_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = requests.len(), "listed open requests");
        Ok(requests)
    }

    #[tracing::instrument(skip(self), fields(request_id = %id, responder_id = %responder_id, ride_offer_id = %ride_offer_id))]
    async fn mark_responded_if_active(
        &self,
        id: Uuid,
        responder_id: Uuid,
        ride_offer_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        tracing::debug!("claiming private request response slot");

        let result = sqlx::query(
            r#"
            UPDATE private_requests
            SET status = 'responded', responded_by = $2, ride_offer_id = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .bind(responder_id)
        .bind(ride_offer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let claimed = result.rows_affected() > 0;
        tracing::debug!(request_id = %id, claimed, "response slot claim finished");
        Ok(claimed)
    }

    #[tracing::instrument(skip(self), fields(request_id = %id, %status))]
    async fn set_status(
        &self,
        id: Uuid,
        status: PrivateRequestStatus,
    ) -> Result<(), RepositoryError> {
        tracing::debug!("setting private request status");

        let result = sqlx::query(
            r#"
            UPDATE private_requests
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tracing::debug!(request_id = %id, "private request status set successfully");
        Ok(())
    }
}

pub struct PostgresChatMessageRepository {
    pool: PgPool,
}

impl PostgresChatMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn context_column(context: ChatContext) -> (&'static str, Uuid) {
    match context {
        ChatContext::Booking(id) => ("booking_id", id),
        ChatContext::Request(id) => ("request_id", id),
    }
}

impl ChatMessageRepository for PostgresChatMessageRepository {
    #[tracing::instrument(skip(self, message), fields(message_id = %message.id, sender_id = %message.sender_id, receiver_id = %message.receiver_id))]
    async fn create(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        tracing::debug!("creating chat message");

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, booking_id, request_id, sender_id, sender_name,
                                       receiver_id, content, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(message.id)
        .bind(message.booking_id)
        .bind(message.request_id)
        .bind(message.sender_id)
        .bind(&message.sender_name)
        .bind(message.receiver_id)
        .bind(&message.content)
        .bind(message.read)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(message_id = %message.id, "chat message created successfully");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(?context))]
    async fn list_for_context(
        &self,
        context: ChatContext,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        tracing::debug!("listing chat messages for context");

        let (column, id) = context_column(context);
        let query = format!(
            r#"
            SELECT id, booking_id, request_id, sender_id, sender_name, receiver_id, content,
                   read, created_at
            FROM chat_messages
            WHERE {column} = $1
            ORDER BY created_at ASC
            "#
        );
        let messages = sqlx::query_as::<_, ChatMessage>(&query)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = messages.len(), "listed chat messages");
        Ok(messages)
    }

    #[tracing::instrument(skip(self), fields(?context, receiver_id = %receiver_id))]
    async fn mark_read(
        &self,
        context: ChatContext,
        receiver_id: Uuid,
    ) -> Result<u64, RepositoryError> {
        tracing::debug!("marking chat messages read");

        let (column, id) = context_column(context);
        let query = format!(
            r#"
            UPDATE chat_messages
            SET read = TRUE
            WHERE {column} = $1 AND receiver_id = $2 AND read = FALSE
            "#
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(receiver_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(marked = result.rows_affected(), "chat messages marked read");
        Ok(result.rows_affected())
    }
}

pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReviewRepository for PostgresReviewRepository {
    #[tracing::instrument(skip(self, review), fields(review_id = %review.id, ride_id = %review.ride_id, reviewer_id = %review.reviewer_id))]
    async fn create(&self, review: &Review) -> Result<(), RepositoryError> {
        tracing::debug!("creating review");

        sqlx::query(
            r#"
            INSERT INTO reviews (id, ride_id, reviewer_id, reviewer_name, reviewee_id, rating,
                                 comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(review.id)
        .bind(review.ride_id)
        .bind(review.reviewer_id)
        .bind(&review.reviewer_name)
        .bind(review.reviewee_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        tracing::debug!(review_id = %review.id, "review created successfully");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(ride_id = %ride_id, reviewer_id = %reviewer_id, reviewee_id = %reviewee_id))]
    async fn exists(
        &self,
        ride_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        tracing::debug!("checking for existing review");

        let found: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reviews
                WHERE ride_id = $1 AND reviewer_id = $2 AND reviewee_id = $3
            )
            "#,
        )
        .bind(ride_id)
        .bind(reviewer_id)
        .bind(reviewee_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(found.0)
    }

    #[tracing::instrument(skip(self), fields(reviewee_id = %reviewee_id))]
    async fn list_for_reviewee(&self, reviewee_id: Uuid) -> Result<Vec<Review>, RepositoryError> {
        tracing::debug!("listing reviews for reviewee");

        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, ride_id, reviewer_id, reviewer_name, reviewee_id, rating, comment, created_at
            FROM reviews
            WHERE reviewee_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(reviewee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(count = reviews.len(), "listed reviews");
        Ok(reviews)
    }

    #[tracing::instrument(skip(self), fields(reviewee_id = %reviewee_id))]
    async fn aggregate_for_reviewee(
        &self,
        reviewee_id: Uuid,
    ) -> Result<(f64, i64), RepositoryError> {
        tracing::debug!("aggregating reviews for reviewee");

        let result: (Option<f64>, i64) = sqlx::query_as(
            r#"
            SELECT AVG(rating::float8), COUNT(*)
            FROM reviews
            WHERE reviewee_id = $1
            "#,
        )
        .bind(reviewee_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let mean = result.0.unwrap_or(0.0);
        tracing::debug!(reviewee_id = %reviewee_id, mean, count = result.1, "review aggregate retrieved");
        Ok((mean, result.1))
    }
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for PostgresUserRepository {
    #[tracing::instrument(skip(self), fields(user_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        tracing::debug!("finding user by id");

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, display_name, rating, total_ratings, total_rides_as_driver,
                   total_rides_as_passenger, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(user_id = %id, rating, total_ratings))]
    async fn set_rating_summary(
        &self,
        id: Uuid,
        rating: f64,
        total_ratings: i64,
    ) -> Result<(), RepositoryError> {
        tracing::debug!("setting user rating summary");

        // Identity lives in a separate service, so the summary row may
        // not exist yet when the first review lands.
        sqlx::query(
            r#"
            INSERT INTO users (id, rating, total_ratings, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT (id)
            DO UPDATE SET rating = $2, total_ratings = $3, updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(rating)
        .bind(total_ratings)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(user_id = %id, "user rating summary set successfully");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    async fn delete_account_data(&self, user_id: Uuid) -> Result<(), RepositoryError> {
        tracing::debug!("deleting account data");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM chat_messages WHERE sender_id = $1 OR receiver_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM reviews WHERE reviewer_id = $1 OR reviewee_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM bookings WHERE passenger_id = $1 OR driver_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM private_requests WHERE passenger_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM rides WHERE driver_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        tracing::debug!(user_id = %user_id, "account data deleted successfully");
        Ok(())
    }
}

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
