use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::delivery::http::v1::middleware::AuthenticatedUser;
use crate::domain::ride::{Itinerary, Ride, RideStatus};
use crate::usecase::error::UsecaseError;
use crate::usecase::rides::RideSearchQuery;
use crate::AppState;

#[derive(Serialize)]
pub struct RideResponse {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub pickup_location: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub drop_location: String,
    pub drop_lat: f64,
    pub drop_lng: f64,
    pub date: NaiveDate,
    pub time: String,
    pub available_seats: i32,
    pub booked_seats: i32,
    pub seats_remaining: i32,
    pub price_per_seat: f64,
    pub status: RideStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_private_request: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct RideSearchResponse {
    #[serde(flatten)]
    pub ride: RideResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

#[derive(Deserialize, Validate)]
pub struct CreateRideRequest {
    #[validate(length(min = 1, max = 300))]
    pub pickup_location: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub pickup_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub pickup_lng: f64,
    #[validate(length(min = 1, max = 300))]
    pub drop_location: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub drop_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub drop_lng: f64,
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 20))]
    pub time: String,
    #[validate(range(min = 1, max = 8))]
    pub available_seats: i32,
    #[validate(range(min = 0.0))]
    pub price_per_seat: f64,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateRideRequest {
    #[validate(range(min = 1, max = 8))]
    pub available_seats: Option<i32>,
    #[validate(range(min = 0.0))]
    pub price_per_seat: Option<f64>,
    pub status: Option<RideStatus>,
}

/// The listing defaults to active rides; pass `?status=` explicitly to
/// browse cancelled or completed ones.
#[derive(Debug, Deserialize)]
pub struct ListRidesQuery {
    #[serde(default = "default_list_status")]
    pub status: Option<RideStatus>,
}

fn default_list_status() -> Option<RideStatus> {
    Some(RideStatus::Active)
}

#[derive(Debug, Deserialize)]
pub struct SearchRidesRequest {
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub drop_lat: Option<f64>,
    pub drop_lng: Option<f64>,
    pub date: Option<NaiveDate>,
    pub seats_needed: Option<i32>,
}

pub(super) fn ride_to_response(ride: Ride) -> RideResponse {
    let seats_remaining = ride.seats_remaining();
    RideResponse {
        id: ride.id,
        driver_id: ride.driver_id,
        driver_name: ride.driver_name,
        pickup_location: ride.pickup_location,
        pickup_lat: ride.pickup_lat,
        pickup_lng: ride.pickup_lng,
        drop_location: ride.drop_location,
        drop_lat: ride.drop_lat,
        drop_lng: ride.drop_lng,
        date: ride.date,
        time: ride.time,
        available_seats: ride.available_seats,
        booked_seats: ride.booked_seats,
        seats_remaining,
        price_per_seat: ride.price_per_seat,
        status: ride.status,
        from_private_request: ride.from_private_request,
        notes: ride.notes,
        created_at: ride.created_at,
        updated_at: ride.updated_at,
    }
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id))]
pub async fn create_ride(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateRideRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling create ride request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(user_id = %user.user_id, ?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(format!("{:?}", validation_errors)));
    }

    let itinerary = Itinerary {
        pickup_location: payload.pickup_location,
        pickup_lat: payload.pickup_lat,
        pickup_lng: payload.pickup_lng,
        drop_location: payload.drop_location,
        drop_lat: payload.drop_lat,
        drop_lng: payload.drop_lng,
        date: payload.date,
        time: payload.time,
    };
    let ride = state
        .rides_usecase
        .create_ride(
            user.user_id,
            user.display_name,
            itinerary,
            payload.available_seats,
            payload.price_per_seat,
            payload.notes,
        )
        .await?;

    metrics::counter!("rides_created_total").increment(1);

    tracing::debug!(ride_id = %ride.id, "ride created successfully");
    Ok((StatusCode::CREATED, Json(ride_to_response(ride))))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id, ?query))]
pub async fn list_rides(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<ListRidesQuery>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling list rides request");

    let rides = state.rides_usecase.list_rides(query.status).await?;
    let response: Vec<RideResponse> = rides.into_iter().map(ride_to_response).collect();

    tracing::debug!(count = response.len(), "rides listed successfully");
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn my_rides(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling my rides request");

    let rides = state.rides_usecase.my_rides(user.user_id).await?;
    let response: Vec<RideResponse> = rides.into_iter().map(ride_to_response).collect();

    tracing::debug!(count = response.len(), "driver rides listed successfully");
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id))]
pub async fn search_rides(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<SearchRidesRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling search rides request");

    let start = std::time::Instant::now();
    let hits = state
        .rides_usecase
        .search_rides(RideSearchQuery {
            pickup_lat: payload.pickup_lat,
            pickup_lng: payload.pickup_lng,
            drop_lat: payload.drop_lat,
            drop_lng: payload.drop_lng,
            date: payload.date,
            seats_needed: payload.seats_needed,
        })
        .await?;
    let response: Vec<RideSearchResponse> = hits
        .into_iter()
        .map(|hit| RideSearchResponse {
            ride: ride_to_response(hit.ride),
            relevance_score: hit.relevance_score,
        })
        .collect();

    metrics::counter!("ride_searches_total").increment(1);
    metrics::histogram!("ride_search_duration_seconds").record(start.elapsed().as_secs_f64());

    tracing::debug!(count = response.len(), "rides searched successfully");
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id, ride_id = %ride_id))]
pub async fn get_ride(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(ride_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling get ride request");

    let ride = state.rides_usecase.get_ride(ride_id).await?;

    tracing::debug!(ride_id = %ride_id, "ride retrieved successfully");
    Ok((StatusCode::OK, Json(ride_to_response(ride))))
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id, ride_id = %ride_id))]
pub async fn update_ride(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(ride_id): Path<Uuid>,
    Json(payload): Json<UpdateRideRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling update ride request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(user_id = %user.user_id, ?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(format!("{:?}", validation_errors)));
    }

    let ride = state
        .rides_usecase
        .update_ride(
            user.user_id,
            ride_id,
            payload.available_seats,
            payload.price_per_seat,
            payload.status,
        )
        .await?;

    tracing::debug!(ride_id = %ride_id, "ride updated successfully");
    Ok((StatusCode::OK, Json(ride_to_response(ride))))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id, ride_id = %ride_id))]
pub async fn cancel_ride(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(ride_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling cancel ride request");

    state.rides_usecase.cancel_ride(user.user_id, ride_id).await?;

    tracing::debug!(ride_id = %ride_id, "ride cancelled successfully");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults_to_active() {
        let query: ListRidesQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.status, Some(RideStatus::Active));
    }

    #[test]
    fn test_list_query_honors_explicit_status() {
        let query: ListRidesQuery = serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(query.status, Some(RideStatus::Completed));
    }
}
