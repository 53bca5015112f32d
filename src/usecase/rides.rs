use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::ride::{Itinerary, Ride, RideStatus};
use crate::usecase::contracts::{BookingRepository, RideRepository};
use crate::usecase::error::UsecaseError;

#[derive(Debug, Clone, Default)]
pub struct RideSearchQuery {
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub drop_lat: Option<f64>,
    pub drop_lng: Option<f64>,
    pub date: Option<NaiveDate>,
    pub seats_needed: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct RideSearchHit {
    pub ride: Ride,
    pub relevance_score: Option<f64>,
}

pub struct RidesUseCase<R, B>
where
    R: RideRepository,
    B: BookingRepository,
{
    ride_repository: R,
    booking_repository: B,
}

impl<R, B> RidesUseCase<R, B>
where
    R: RideRepository,
    B: BookingRepository,
{
    pub fn new(ride_repository: R, booking_repository: B) -> Self {
        Self {
            ride_repository,
            booking_repository,
        }
    }

    #[tracing::instrument(skip(self, itinerary, notes), fields(driver_id = %driver_id))]
    pub async fn create_ride(
        &self,
        driver_id: Uuid,
        driver_name: String,
        itinerary: Itinerary,
        available_seats: i32,
        price_per_seat: f64,
        notes: Option<String>,
    ) -> Result<Ride, UsecaseError> {
        tracing::debug!("creating ride offer");

        let ride = Ride::new(
            driver_id,
            driver_name,
            itinerary,
            available_seats,
            price_per_seat,
            notes,
        );
        self.ride_repository.create(&ride).await?;

        tracing::info!(ride_id = %ride.id, "ride offer created");
        Ok(ride)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_rides(&self, status: Option<RideStatus>) -> Result<Vec<Ride>, UsecaseError> {
        tracing::debug!("listing rides");

        let rides = self.ride_repository.list_by_status(status).await?;

        tracing::debug!(count = rides.len(), "rides listed");
        Ok(rides)
    }

    #[tracing::instrument(skip(self), fields(driver_id = %driver_id))]
    pub async fn my_rides(&self, driver_id: Uuid) -> Result<Vec<Ride>, UsecaseError> {
        tracing::debug!("listing driver rides");

        let rides = self.ride_repository.list_by_driver(driver_id).await?;

        tracing::debug!(count = rides.len(), "driver rides listed");
        Ok(rides)
    }

    #[tracing::instrument(skip(self), fields(ride_id = %ride_id))]
    pub async fn get_ride(&self, ride_id: Uuid) -> Result<Ride, UsecaseError> {
        tracing::debug!("getting ride");

        self.ride_repository
            .find_by_id(ride_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Ride".to_string()))
    }

    /// Applies only the provided patch fields. Driver-only.
    #[tracing::instrument(skip(self), fields(requester_id = %requester_id, ride_id = %ride_id))]
    pub async fn update_ride(
        &self,
        requester_id: Uuid,
        ride_id: Uuid,
        available_seats: Option<i32>,
        price_per_seat: Option<f64>,
        status: Option<RideStatus>,
    ) -> Result<Ride, UsecaseError> {
        tracing::debug!("updating ride");

        let mut ride = self.get_ride(ride_id).await?;

        if ride.driver_id != requester_id {
            tracing::warn!("unauthorized ride update attempt");
            return Err(UsecaseError::Forbidden("Not authorized".to_string()));
        }

        if let Some(seats) = available_seats {
            if seats < ride.booked_seats {
                return Err(UsecaseError::Validation(format!(
                    "Cannot reduce seats below {} already booked",
                    ride.booked_seats
                )));
            }
        }

        ride.apply_update(available_seats, price_per_seat, status);
        self.ride_repository.update(&ride).await?;

        tracing::info!(%ride_id, "ride updated");
        Ok(ride)
    }

    /// Soft-cancel: the ride becomes cancelled and its pending bookings
    /// are reaped. Accepted bookings are deliberately left untouched.
    #[tracing::instrument(skip(self), fields(requester_id = %requester_id, ride_id = %ride_id))]
    pub async fn cancel_ride(&self, requester_id: Uuid, ride_id: Uuid) -> Result<(), UsecaseError> {
        tracing::debug!("cancelling ride");

        let ride = self.get_ride(ride_id).await?;

        if ride.driver_id != requester_id {
            tracing::warn!("unauthorized ride cancel attempt");
            return Err(UsecaseError::Forbidden("Not authorized".to_string()));
        }

        self.ride_repository
            .set_status(ride_id, RideStatus::Cancelled)
            .await?;

        let reaped = self
            .booking_repository
            .cancel_pending_for_ride(ride_id)
            .await?;

        tracing::info!(%ride_id, reaped, "ride cancelled, pending bookings reaped");
        Ok(())
    }

    /// Filters by date and remaining capacity; when all four endpoint
    /// coordinates are supplied, results are sorted ascending by a
    /// Manhattan-distance relevance score. This is a crude heuristic on
    /// raw coordinates, kept as-is rather than replaced with geodesic
    /// distance.
    #[tracing::instrument(skip(self, query))]
    pub async fn search_rides(
        &self,
        query: RideSearchQuery,
    ) -> Result<Vec<RideSearchHit>, UsecaseError> {
        tracing::debug!(?query.date, ?query.seats_needed, "searching rides");

        let seats_needed = query.seats_needed.unwrap_or(1);
        let rides = self
            .ride_repository
            .search_active(query.date, seats_needed)
            .await?;

        let coords = match (
            query.pickup_lat,
            query.pickup_lng,
            query.drop_lat,
            query.drop_lng,
        ) {
            (Some(p_lat), Some(p_lng), Some(d_lat), Some(d_lng)) => {
                Some((p_lat, p_lng, d_lat, d_lng))
            }
            _ => None,
        };

        let mut hits: Vec<RideSearchHit> = rides
            .into_iter()
            .map(|ride| {
                let relevance_score = coords.map(|(p_lat, p_lng, d_lat, d_lng)| {
                    let pickup_dist =
                        (ride.pickup_lat - p_lat).abs() + (ride.pickup_lng - p_lng).abs();
                    let drop_dist = (ride.drop_lat - d_lat).abs() + (ride.drop_lng - d_lng).abs();
                    pickup_dist + drop_dist
                });
                RideSearchHit {
                    ride,
                    relevance_score,
                }
            })
            .collect();

        if coords.is_some() {
            // Stable sort: ties keep the newest-first repository order.
            hits.sort_by(|a, b| {
                a.relevance_score
                    .partial_cmp(&b.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        tracing::debug!(count = hits.len(), scored = coords.is_some(), "ride search done");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::contracts::{MockBookingRepository, MockRideRepository};

    fn itinerary() -> Itinerary {
        Itinerary {
            pickup_location: "Indiranagar".to_string(),
            pickup_lat: 10.0,
            pickup_lng: 20.0,
            drop_location: "Whitefield".to_string(),
            drop_lat: 11.0,
            drop_lng: 21.0,
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            time: "09:00".to_string(),
        }
    }

    fn make_ride(driver_id: Uuid) -> Ride {
        Ride::new(driver_id, "Ravi".to_string(), itinerary(), 4, 100.0, None)
    }

    fn ride_at(pickup_lat: f64, drop_lat: f64) -> Ride {
        let mut it = itinerary();
        it.pickup_lat = pickup_lat;
        it.pickup_lng = 0.0;
        it.drop_lat = drop_lat;
        it.drop_lng = 0.0;
        Ride::new(Uuid::new_v4(), "Ravi".to_string(), it, 4, 100.0, None)
    }

    #[tokio::test]
    async fn test_create_ride() {
        let mut ride_repo = MockRideRepository::new();
        ride_repo.expect_create().times(1).returning(|_| Ok(()));
        let usecase = RidesUseCase::new(ride_repo, MockBookingRepository::new());

        let driver_id = Uuid::new_v4();
        let ride = usecase
            .create_ride(driver_id, "Ravi".to_string(), itinerary(), 4, 100.0, None)
            .await
            .unwrap();

        assert_eq!(ride.driver_id, driver_id);
        assert_eq!(ride.status, RideStatus::Active);
        assert_eq!(ride.booked_seats, 0);
    }

    #[tokio::test]
    async fn test_get_ride_not_found() {
        let mut ride_repo = MockRideRepository::new();
        ride_repo.expect_find_by_id().times(1).returning(|_| Ok(None));
        let usecase = RidesUseCase::new(ride_repo, MockBookingRepository::new());

        let result = usecase.get_ride(Uuid::new_v4()).await;

        assert!(matches!(result, Err(UsecaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_ride_requires_driver() {
        let mut ride_repo = MockRideRepository::new();
        let ride = make_ride(Uuid::new_v4());
        let ride_id = ride.id;
        let ride_clone = ride.clone();
        ride_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(ride_clone.clone())));
        let usecase = RidesUseCase::new(ride_repo, MockBookingRepository::new());

        let result = usecase
            .update_ride(Uuid::new_v4(), ride_id, None, Some(200.0), None)
            .await;

        assert!(matches!(result, Err(UsecaseError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_ride_applies_patch_fields_only() {
        let mut ride_repo = MockRideRepository::new();
        let driver_id = Uuid::new_v4();
        let ride = make_ride(driver_id);
        let ride_id = ride.id;
        let ride_clone = ride.clone();
        ride_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(ride_clone.clone())));
        ride_repo.expect_update().times(1).returning(|_| Ok(()));
        let usecase = RidesUseCase::new(ride_repo, MockBookingRepository::new());

        let updated = usecase
            .update_ride(driver_id, ride_id, None, Some(250.0), None)
            .await
            .unwrap();

        assert_eq!(updated.price_per_seat, 250.0);
        assert_eq!(updated.available_seats, 4);
        assert_eq!(updated.status, RideStatus::Active);
    }

    #[tokio::test]
    async fn test_update_ride_rejects_seats_below_booked() {
        let mut ride_repo = MockRideRepository::new();
        let driver_id = Uuid::new_v4();
        let mut ride = make_ride(driver_id);
        ride.booked_seats = 3;
        let ride_id = ride.id;
        let ride_clone = ride.clone();
        ride_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(ride_clone.clone())));
        let usecase = RidesUseCase::new(ride_repo, MockBookingRepository::new());

        let result = usecase
            .update_ride(driver_id, ride_id, Some(2), None, None)
            .await;

        assert!(matches!(result, Err(UsecaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_cancel_ride_cascades_to_pending_bookings() {
        let mut ride_repo = MockRideRepository::new();
        let mut booking_repo = MockBookingRepository::new();
        let driver_id = Uuid::new_v4();
        let ride = make_ride(driver_id);
        let ride_id = ride.id;
        let ride_clone = ride.clone();

        ride_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(ride_clone.clone())));
        ride_repo
            .expect_set_status()
            .with(
                mockall::predicate::eq(ride_id),
                mockall::predicate::eq(RideStatus::Cancelled),
            )
            .times(1)
            .returning(|_, _| Ok(()));
        booking_repo
            .expect_cancel_pending_for_ride()
            .with(mockall::predicate::eq(ride_id))
            .times(1)
            .returning(|_| Ok(2));

        let usecase = RidesUseCase::new(ride_repo, booking_repo);
        let result = usecase.cancel_ride(driver_id, ride_id).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_ride_forbidden_for_non_driver() {
        let mut ride_repo = MockRideRepository::new();
        let ride = make_ride(Uuid::new_v4());
        let ride_id = ride.id;
        let ride_clone = ride.clone();
        ride_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(ride_clone.clone())));
        let usecase = RidesUseCase::new(ride_repo, MockBookingRepository::new());

        let result = usecase.cancel_ride(Uuid::new_v4(), ride_id).await;

        assert!(matches!(result, Err(UsecaseError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_search_sorts_by_manhattan_relevance() {
        let mut ride_repo = MockRideRepository::new();
        let near = ride_at(0.1, 0.1);
        let far = ride_at(5.0, 5.0);
        let near_id = near.id;
        let far_id = far.id;
        // Repository returns newest-first; "far" is newer here.
        let rides = vec![far.clone(), near.clone()];
        ride_repo
            .expect_search_active()
            .times(1)
            .returning(move |_, _| Ok(rides.clone()));
        let usecase = RidesUseCase::new(ride_repo, MockBookingRepository::new());

        let hits = usecase
            .search_rides(RideSearchQuery {
                pickup_lat: Some(0.0),
                pickup_lng: Some(0.0),
                drop_lat: Some(0.0),
                drop_lng: Some(0.0),
                date: None,
                seats_needed: Some(1),
            })
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].ride.id, near_id);
        assert_eq!(hits[1].ride.id, far_id);
        assert_eq!(hits[0].relevance_score, Some(0.2));
        assert_eq!(hits[1].relevance_score, Some(10.0));
    }

    #[tokio::test]
    async fn test_search_without_coordinates_keeps_order_and_skips_scoring() {
        let mut ride_repo = MockRideRepository::new();
        let first = ride_at(5.0, 5.0);
        let second = ride_at(0.1, 0.1);
        let first_id = first.id;
        let rides = vec![first.clone(), second.clone()];
        ride_repo
            .expect_search_active()
            .times(1)
            .returning(move |_, _| Ok(rides.clone()));
        let usecase = RidesUseCase::new(ride_repo, MockBookingRepository::new());

        let hits = usecase
            .search_rides(RideSearchQuery {
                pickup_lat: Some(0.0),
                // Missing the other three coordinates: no scoring.
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(hits[0].ride.id, first_id);
        assert!(hits.iter().all(|h| h.relevance_score.is_none()));
    }

    #[tokio::test]
    async fn test_search_defaults_to_one_seat() {
        let mut ride_repo = MockRideRepository::new();
        ride_repo
            .expect_search_active()
            .with(
                mockall::predicate::eq(None::<NaiveDate>),
                mockall::predicate::eq(1),
            )
            .times(1)
            .returning(|_, _| Ok(vec![]));
        let usecase = RidesUseCase::new(ride_repo, MockBookingRepository::new());

        let hits = usecase.search_rides(RideSearchQuery::default()).await.unwrap();

        assert!(hits.is_empty());
    }
}
