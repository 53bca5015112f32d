use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::delivery::http::v1::middleware::AuthenticatedUser;
use crate::usecase::error::UsecaseError;
use crate::AppState;

#[derive(Serialize)]
pub struct UserProfileResponse {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub rating: f64,
    pub total_ratings: i64,
    pub total_rides_as_driver: i64,
    pub total_rides_as_passenger: i64,
    pub created_at: DateTime<Utc>,
}

#[tracing::instrument(skip(state), fields(requester_id = %user.user_id, user_id = %user_id))]
pub async fn get_user_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling get user profile request");

    let profile = state.users_usecase.get_profile(user_id).await?;

    tracing::debug!(user_id = %user_id, "user profile retrieved successfully");
    Ok((
        StatusCode::OK,
        Json(UserProfileResponse {
            id: profile.id,
            display_name: profile.display_name,
            rating: profile.rating,
            total_ratings: profile.total_ratings,
            total_rides_as_driver: profile.total_rides_as_driver,
            total_rides_as_passenger: profile.total_rides_as_passenger,
            created_at: profile.created_at,
        }),
    ))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling delete account request");

    state.users_usecase.delete_account(user.user_id).await?;

    tracing::debug!("account deleted successfully");
    Ok(StatusCode::NO_CONTENT)
}
