use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::delivery::http::v1::middleware::AuthenticatedUser;
use crate::domain::booking::{Booking, BookingStatus};
use crate::usecase::error::UsecaseError;
use crate::AppState;

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub passenger_id: Uuid,
    pub passenger_name: String,
    pub driver_id: Uuid,
    pub seats: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total_price: f64,
    pub status: BookingStatus,
    pub pickup_location: String,
    pub drop_location: String,
    pub date: NaiveDate,
    pub time: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub ride_id: Uuid,
    #[validate(range(min = 1, max = 8))]
    pub seats: i32,
    #[validate(length(max = 500))]
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

fn booking_to_response(booking: Booking) -> BookingResponse {
    BookingResponse {
        id: booking.id,
        ride_id: booking.ride_id,
        passenger_id: booking.passenger_id,
        passenger_name: booking.passenger_name,
        driver_id: booking.driver_id,
        seats: booking.seats,
        message: booking.message,
        total_price: booking.total_price,
        status: booking.status,
        pickup_location: booking.pickup_location,
        drop_location: booking.drop_location,
        date: booking.date,
        time: booking.time,
        created_at: booking.created_at,
        updated_at: booking.updated_at,
    }
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id))]
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling create booking request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(user_id = %user.user_id, ?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(format!("{:?}", validation_errors)));
    }

    let booking = state
        .bookings_usecase
        .create_booking(
            user.user_id,
            user.display_name,
            payload.ride_id,
            payload.seats,
            payload.message,
        )
        .await?;

    metrics::counter!("bookings_created_total").increment(1);

    tracing::debug!(booking_id = %booking.id, "booking created successfully");
    Ok((StatusCode::CREATED, Json(booking_to_response(booking))))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling my bookings request");

    let bookings = state.bookings_usecase.my_bookings(user.user_id).await?;
    let response: Vec<BookingResponse> = bookings.into_iter().map(booking_to_response).collect();

    tracing::debug!(count = response.len(), "passenger bookings listed successfully");
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn booking_requests(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling booking requests request");

    let bookings = state.bookings_usecase.booking_requests(user.user_id).await?;
    let response: Vec<BookingResponse> = bookings.into_iter().map(booking_to_response).collect();

    tracing::debug!(count = response.len(), "driver booking requests listed successfully");
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id, booking_id = %booking_id))]
pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<UpdateBookingStatusRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!(status = %payload.status, "handling update booking status request");

    let booking = state
        .bookings_usecase
        .update_status(user.user_id, booking_id, payload.status)
        .await?;

    metrics::counter!("booking_status_updates_total", "status" => booking.status.to_string())
        .increment(1);

    tracing::debug!(booking_id = %booking_id, status = %booking.status, "booking status updated successfully");
    Ok((StatusCode::OK, Json(booking_to_response(booking))))
}
