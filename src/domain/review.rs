use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewer_name: String,
    pub reviewee_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        ride_id: Uuid,
        reviewer_id: Uuid,
        reviewer_name: String,
        reviewee_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ride_id,
            reviewer_id,
            reviewer_name,
            reviewee_id,
            rating,
            comment,
            created_at: Utc::now(),
        }
    }
}

/// Mean rating over every review a user has received, rounded to one
/// decimal. Stored on the user record as a cached projection.
pub fn round_rating(mean: f64) -> f64 {
    (mean * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_creation() {
        let ride_id = Uuid::new_v4();
        let reviewer_id = Uuid::new_v4();
        let reviewee_id = Uuid::new_v4();

        let review = Review::new(
            ride_id,
            reviewer_id,
            "Asha".to_string(),
            reviewee_id,
            5,
            Some("Smooth ride".to_string()),
        );

        assert_eq!(review.ride_id, ride_id);
        assert_eq!(review.reviewer_id, reviewer_id);
        assert_eq!(review.reviewee_id, reviewee_id);
        assert_eq!(review.rating, 5);
    }

    #[test]
    fn test_round_rating_one_decimal() {
        assert_eq!(round_rating(14.0 / 3.0), 4.7);
        assert_eq!(round_rating(4.25), 4.3);
        assert_eq!(round_rating(5.0), 5.0);
        assert_eq!(round_rating(0.0), 0.0);
    }
}
