use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::private_request::PrivateRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ride_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Active,
    Cancelled,
    Completed,
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RideStatus::Active => "active",
            RideStatus::Cancelled => "cancelled",
            RideStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Pickup/drop endpoints with raw coordinates plus the departure date and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub pickup_location: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub drop_location: String,
    pub drop_lat: f64,
    pub drop_lng: f64,
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Ride {
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
    pub price_per_seat: f64,
    pub status: RideStatus,
    pub from_private_request: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ride {
    pub fn new(
        driver_id: Uuid,
        driver_name: String,
        itinerary: Itinerary,
        available_seats: i32,
        price_per_seat: f64,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            driver_id,
            driver_name,
            pickup_location: itinerary.pickup_location,
            pickup_lat: itinerary.pickup_lat,
            pickup_lng: itinerary.pickup_lng,
            drop_location: itinerary.drop_location,
            drop_lat: itinerary.drop_lat,
            drop_lng: itinerary.drop_lng,
            date: itinerary.date,
            time: itinerary.time,
            available_seats,
            booked_seats: 0,
            price_per_seat,
            status: RideStatus::Active,
            from_private_request: None,
            notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Offer materialized by a driver responding to a private request.
    /// The driver has not set a price yet, so it starts at zero.
    pub fn from_request(driver_id: Uuid, driver_name: String, request: &PrivateRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            driver_id,
            driver_name,
            pickup_location: request.from_location.clone(),
            pickup_lat: request.from_lat,
            pickup_lng: request.from_lng,
            drop_location: request.to_location.clone(),
            drop_lat: request.to_lat,
            drop_lng: request.to_lng,
            date: request.preferred_date,
            time: request.preferred_time.clone(),
            available_seats: request.seats_needed,
            booked_seats: 0,
            price_per_seat: 0.0,
            status: RideStatus::Active,
            from_private_request: Some(request.id),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn seats_remaining(&self) -> i32 {
        self.available_seats - self.booked_seats
    }

    pub fn apply_update(
        &mut self,
        available_seats: Option<i32>,
        price_per_seat: Option<f64>,
        status: Option<RideStatus>,
    ) {
        if let Some(seats) = available_seats {
            self.available_seats = seats;
        }
        if let Some(price) = price_per_seat {
            self.price_per_seat = price;
        }
        if let Some(status) = status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn itinerary() -> Itinerary {
        Itinerary {
            pickup_location: "Indiranagar".to_string(),
            pickup_lat: 12.9716,
            pickup_lng: 77.6412,
            drop_location: "Electronic City".to_string(),
            drop_lat: 12.8399,
            drop_lng: 77.6770,
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            time: "08:30".to_string(),
        }
    }

    #[test]
    fn test_new_ride_starts_active_with_no_booked_seats() {
        let ride = Ride::new(Uuid::new_v4(), "Ravi".to_string(), itinerary(), 4, 150.0, None);

        assert_eq!(ride.status, RideStatus::Active);
        assert_eq!(ride.booked_seats, 0);
        assert_eq!(ride.seats_remaining(), 4);
        assert!(ride.from_private_request.is_none());
    }

    #[test]
    fn test_apply_update_only_touches_provided_fields() {
        let mut ride = Ride::new(Uuid::new_v4(), "Ravi".to_string(), itinerary(), 4, 150.0, None);

        ride.apply_update(None, Some(200.0), None);

        assert_eq!(ride.available_seats, 4);
        assert_eq!(ride.price_per_seat, 200.0);
        assert_eq!(ride.status, RideStatus::Active);
    }

    #[test]
    fn test_from_request_seeds_itinerary_and_links_back() {
        let request = PrivateRequest::new(
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
            3,
            None,
        );
        let driver_id = Uuid::new_v4();

        let ride = Ride::from_request(driver_id, "Ravi".to_string(), &request);

        assert_eq!(ride.driver_id, driver_id);
        assert_eq!(ride.pickup_location, "Koramangala");
        assert_eq!(ride.available_seats, 3);
        assert_eq!(ride.price_per_seat, 0.0);
        assert_eq!(ride.from_private_request, Some(request.id));
    }
}
