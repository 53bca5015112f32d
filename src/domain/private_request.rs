use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Requests become invisible to responders 24 hours after creation.
/// Expiry is enforced by query-time filtering, not a background job.
pub const REQUEST_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "private_request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PrivateRequestStatus {
    Active,
    Responded,
    Cancelled,
}

impl std::fmt::Display for PrivateRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrivateRequestStatus::Active => "active",
            PrivateRequestStatus::Responded => "responded",
            PrivateRequestStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PrivateRequest {
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
    pub message: Option<String>,
    pub status: PrivateRequestStatus,
    pub responded_by: Option<Uuid>,
    pub ride_offer_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrivateRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        passenger_id: Uuid,
        passenger_name: String,
        from_location: String,
        from_lat: f64,
        from_lng: f64,
        to_location: String,
        to_lat: f64,
        to_lng: f64,
        preferred_date: NaiveDate,
        preferred_time: String,
        seats_needed: i32,
        message: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            passenger_id,
            passenger_name,
            from_location,
            from_lat,
            from_lng,
            to_location,
            to_lat,
            to_lng,
            preferred_date,
            preferred_time,
            seats_needed,
            message,
            status: PrivateRequestStatus::Active,
            responded_by: None,
            ride_offer_id: None,
            expires_at: now + Duration::hours(REQUEST_TTL_HOURS),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request() -> PrivateRequest {
        PrivateRequest::new(
            Uuid::new_v4(),
            "Asha".to_string(),
            "Koramangala".to_string(),
            12.9352,
            77.6245,
            "Airport".to_string(),
            13.1986,
            77.7066,
            NaiveDate::from_ymd_opt(2025, 9, 2).unwrap(),
            "06:00".to_string(),
            2,
            Some("Early flight".to_string()),
        )
    }

    #[test]
    fn test_new_request_is_active_with_24h_expiry() {
        let request = make_request();

        assert_eq!(request.status, PrivateRequestStatus::Active);
        assert_eq!(
            request.expires_at - request.created_at,
            Duration::hours(REQUEST_TTL_HOURS)
        );
        assert!(request.responded_by.is_none());
        assert!(request.ride_offer_id.is_none());
    }

    #[test]
    fn test_expiry_boundary() {
        let request = make_request();

        assert!(!request.is_expired(request.created_at));
        assert!(!request.is_expired(request.expires_at - Duration::seconds(1)));
        assert!(request.is_expired(request.expires_at));
        assert!(request.is_expired(request.expires_at + Duration::hours(1)));
    }
}
