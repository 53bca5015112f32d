use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Denormalized user summary maintained by the review flow. Identity
/// and profile editing live in a separate service; this record only
/// exists so counterpart reputation can be shown and updated.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub rating: f64,
    pub total_ratings: i64,
    pub total_rides_as_driver: i64,
    pub total_rides_as_passenger: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
