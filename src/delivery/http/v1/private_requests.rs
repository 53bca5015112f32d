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
use crate::delivery::http::v1::rides::RideResponse;
use crate::domain::private_request::{PrivateRequest, PrivateRequestStatus};
use crate::usecase::error::UsecaseError;
use crate::usecase::private_requests::NewPrivateRequest;
use crate::AppState;

#[derive(Serialize)]
pub struct PrivateRequestResponse {
    pub id: Uuid,
    pub passenger_id: Uuid,
    pub passenger_name: String,
    pub from_location: String,
    pub from_lat: f64,
    pub from_lng: f64,
    pub to_location: String,
    pub to_lat: f64,
    pub to_lng: f64,
    pub preferred_date: NaiveDate,
    pub preferred_time: String,
    pub seats_needed: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: PrivateRequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responded_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ride_offer_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct RespondResponse {
    pub request: PrivateRequestResponse,
    pub ride_offer: RideResponse,
}

#[derive(Deserialize, Validate)]
pub struct CreatePrivateRequestRequest {
    #[validate(length(min = 1, max = 300))]
    pub from_location: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub from_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub from_lng: f64,
    #[validate(length(min = 1, max = 300))]
    pub to_location: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub to_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub to_lng: f64,
    pub preferred_date: NaiveDate,
    #[validate(length(min = 1, max = 20))]
    pub preferred_time: String,
    #[validate(range(min = 1, max = 8))]
    pub seats_needed: i32,
    #[validate(length(max = 500))]
    pub message: Option<String>,
}

fn request_to_response(request: PrivateRequest) -> PrivateRequestResponse {
    PrivateRequestResponse {
        id: request.id,
        passenger_id: request.passenger_id,
        passenger_name: request.passenger_name,
        from_location: request.from_location,
        from_lat: request.from_lat,
        from_lng: request.from_lng,
        to_location: request.to_location,
        to_lat: request.to_lat,
        to_lng: request.to_lng,
        preferred_date: request.preferred_date,
        preferred_time: request.preferred_time,
        seats_needed: request.seats_needed,
        message: request.message,
        status: request.status,
        responded_by: request.responded_by,
        ride_offer_id: request.ride_offer_id,
        expires_at: request.expires_at,
        created_at: request.created_at,
        updated_at: request.updated_at,
    }
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id))]
pub async fn create_private_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<CreatePrivateRequestRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling create private request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(user_id = %user.user_id, ?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(format!("{:?}", validation_errors)));
    }

    let request = state
        .requests_usecase
        .create_request(
            user.user_id,
            user.display_name,
            NewPrivateRequest {
                from_location: payload.from_location,
                from_lat: payload.from_lat,
                from_lng: payload.from_lng,
                to_location: payload.to_location,
                to_lat: payload.to_lat,
                to_lng: payload.to_lng,
                preferred_date: payload.preferred_date,
                preferred_time: payload.preferred_time,
                seats_needed: payload.seats_needed,
                message: payload.message,
            },
        )
        .await?;

    metrics::counter!("private_requests_created_total").increment(1);

    tracing::debug!(request_id = %request.id, "private request created successfully");
    Ok((StatusCode::CREATED, Json(request_to_response(request))))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn my_private_requests(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling my private requests request");

    let requests = state.requests_usecase.my_requests(user.user_id).await?;
    let response: Vec<PrivateRequestResponse> =
        requests.into_iter().map(request_to_response).collect();

    tracing::debug!(count = response.len(), "own private requests listed successfully");
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn nearby_private_requests(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling nearby private requests request");

    let requests = state.requests_usecase.nearby_requests(user.user_id).await?;
    let response: Vec<PrivateRequestResponse> =
        requests.into_iter().map(request_to_response).collect();

    tracing::debug!(count = response.len(), "nearby private requests listed successfully");
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id, request_id = %request_id))]
pub async fn respond_to_private_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling respond to private request");

    let (request, ride) = state
        .requests_usecase
        .respond(user.user_id, user.display_name, request_id)
        .await?;

    metrics::counter!("private_request_responses_total").increment(1);

    tracing::debug!(request_id = %request_id, ride_id = %ride.id, "private request responded successfully");
    Ok((
        StatusCode::OK,
        Json(RespondResponse {
            request: request_to_response(request),
            ride_offer: super::rides::ride_to_response(ride),
        }),
    ))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id, request_id = %request_id))]
pub async fn cancel_private_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling cancel private request");

    state
        .requests_usecase
        .cancel(user.user_id, request_id)
        .await?;

    tracing::debug!(request_id = %request_id, "private request cancelled successfully");
    Ok(StatusCode::NO_CONTENT)
}
