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
use crate::domain::review::Review;
use crate::usecase::error::UsecaseError;
use crate::AppState;

#[derive(Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewer_name: String,
    pub reviewee_id: Uuid,
    pub rating: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub ride_id: Uuid,
    pub reviewee_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

fn review_to_response(review: Review) -> ReviewResponse {
    ReviewResponse {
        id: review.id,
        ride_id: review.ride_id,
        reviewer_id: review.reviewer_id,
        reviewer_name: review.reviewer_name,
        reviewee_id: review.reviewee_id,
        rating: review.rating,
        comment: review.comment,
        created_at: review.created_at,
    }
}

#[tracing::instrument(skip(state, payload), fields(user_id = %user.user_id))]
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling create review request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(user_id = %user.user_id, ?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(format!("{:?}", validation_errors)));
    }

    let review = state
        .reviews_usecase
        .create_review(
            user.user_id,
            user.display_name,
            payload.ride_id,
            payload.reviewee_id,
            payload.rating,
            payload.comment,
        )
        .await?;

    metrics::counter!("reviews_created_total").increment(1);

    tracing::debug!(review_id = %review.id, "review created successfully");
    Ok((StatusCode::CREATED, Json(review_to_response(review))))
}

#[tracing::instrument(skip(state), fields(user_id = %user.user_id, reviewee_id = %reviewee_id))]
pub async fn get_user_reviews(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(reviewee_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling get user reviews request");

    let reviews = state.reviews_usecase.reviews_for_user(reviewee_id).await?;
    let response: Vec<ReviewResponse> = reviews.into_iter().map(review_to_response).collect();

    tracing::debug!(count = response.len(), "user reviews retrieved successfully");
    Ok((StatusCode::OK, Json(response)))
}
