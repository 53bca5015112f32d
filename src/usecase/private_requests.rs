use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::private_request::{PrivateRequest, PrivateRequestStatus};
use crate::domain::ride::Ride;
use crate::usecase::contracts::{PrivateRequestRepository, RideRepository};
use crate::usecase::error::UsecaseError;

#[derive(Debug, Clone)]
pub struct NewPrivateRequest {
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
}

pub struct PrivateRequestsUseCase<P, R>
where
    P: PrivateRequestRepository,
    R: RideRepository,
{
    request_repository: P,
    ride_repository: R,
}

impl<P, R> PrivateRequestsUseCase<P, R>
where
    P: PrivateRequestRepository,
    R: RideRepository,
{
    pub fn new(request_repository: P, ride_repository: R) -> Self {
        Self {
            request_repository,
            ride_repository,
        }
    }

    #[tracing::instrument(skip(self, new_request), fields(passenger_id = %passenger_id))]
    pub async fn create_request(
        &self,
        passenger_id: Uuid,
        passenger_name: String,
        new_request: NewPrivateRequest,
    ) -> Result<PrivateRequest, UsecaseError> {
        tracing::debug!("creating private request");

        let request = PrivateRequest::new(
            passenger_id,
            passenger_name,
            new_request.from_location,
            new_request.from_lat,
            new_request.from_lng,
            new_request.to_location,
            new_request.to_lat,
            new_request.to_lng,
            new_request.preferred_date,
            new_request.preferred_time,
            new_request.seats_needed,
            new_request.message,
        );
        self.request_repository.create(&request).await?;

        tracing::info!(request_id = %request.id, expires_at = %request.expires_at, "private request created");
        Ok(request)
    }

    #[tracing::instrument(skip(self), fields(passenger_id = %passenger_id))]
    pub async fn my_requests(
        &self,
        passenger_id: Uuid,
    ) -> Result<Vec<PrivateRequest>, UsecaseError> {
        tracing::debug!("listing own private requests");

        let requests = self
            .request_repository
            .list_by_passenger(passenger_id)
            .await?;

        tracing::debug!(count = requests.len(), "own private requests listed");
        Ok(requests)
    }

    /// Open requests a driver can respond to: active, unexpired, not the
    /// requester's own. Despite the name there is no geographic filter.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn nearby_requests(&self, user_id: Uuid) -> Result<Vec<PrivateRequest>, UsecaseError> {
        tracing::debug!("listing nearby private requests");

        let now = Utc::now();
        let requests = self
            .request_repository
            .list_open_excluding(user_id, now)
            .await?;
        let requests: Vec<PrivateRequest> = requests
            .into_iter()
            .filter(|request| !request.is_expired(now))
            .collect();

        tracing::debug!(count = requests.len(), "nearby private requests listed");
        Ok(requests)
    }

    /// A request takes exactly one response. The claim is a conditional
    /// update on status=active, so a second responder fails instead of
    /// materializing a duplicate offer.
    #[tracing::instrument(skip(self), fields(driver_id = %driver_id, request_id = %request_id))]
    pub async fn respond(
        &self,
        driver_id: Uuid,
        driver_name: String,
        request_id: Uuid,
    ) -> Result<(PrivateRequest, Ride), UsecaseError> {
        tracing::debug!("responding to private request");

        let mut request = self
            .request_repository
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Request".to_string()))?;

        if request.passenger_id == driver_id {
            return Err(UsecaseError::Validation(
                "Cannot respond to your own request".to_string(),
            ));
        }

        match request.status {
            PrivateRequestStatus::Active => {}
            PrivateRequestStatus::Responded => {
                return Err(UsecaseError::Conflict(
                    "Request already has a response".to_string(),
                ));
            }
            PrivateRequestStatus::Cancelled => {
                return Err(UsecaseError::InvalidState(
                    "Request is cancelled".to_string(),
                ));
            }
        }

        let ride = Ride::from_request(driver_id, driver_name, &request);

        let claimed = self
            .request_repository
            .mark_responded_if_active(request_id, driver_id, ride.id)
            .await?;
        if !claimed {
            return Err(UsecaseError::Conflict(
                "Request already has a response".to_string(),
            ));
        }

        self.ride_repository.create(&ride).await?;

        request.status = PrivateRequestStatus::Responded;
        request.responded_by = Some(driver_id);
        request.ride_offer_id = Some(ride.id);
        request.updated_at = Utc::now();

        tracing::info!(%request_id, ride_id = %ride.id, "private request responded with ride offer");
        Ok((request, ride))
    }

    #[tracing::instrument(skip(self), fields(requester_id = %requester_id, request_id = %request_id))]
    pub async fn cancel(&self, requester_id: Uuid, request_id: Uuid) -> Result<(), UsecaseError> {
        tracing::debug!("cancelling private request");

        let request = self
            .request_repository
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Request".to_string()))?;

        if request.passenger_id != requester_id {
            tracing::warn!("unauthorized private request cancel attempt");
            return Err(UsecaseError::Forbidden("Not authorized".to_string()));
        }

        self.request_repository
            .set_status(request_id, PrivateRequestStatus::Cancelled)
            .await?;

        tracing::info!(%request_id, "private request cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::contracts::{MockPrivateRequestRepository, MockRideRepository};
    use mockall::predicate::eq;

    fn new_request() -> NewPrivateRequest {
        NewPrivateRequest {
            from_location: "Koramangala".to_string(),
            from_lat: 12.9352,
            from_lng: 77.6245,
            to_location: "Airport".to_string(),
            to_lat: 13.1986,
            to_lng: 77.7066,
            preferred_date: NaiveDate::from_ymd_opt(2025, 9, 2).unwrap(),
            preferred_time: "06:00".to_string(),
            seats_needed: 2,
            message: None,
        }
    }

    fn make_request(passenger_id: Uuid, status: PrivateRequestStatus) -> PrivateRequest {
        let n = new_request();
        let mut request = PrivateRequest::new(
            passenger_id,
            "Asha".to_string(),
            n.from_location,
            n.from_lat,
            n.from_lng,
            n.to_location,
            n.to_lat,
            n.to_lng,
            n.preferred_date,
            n.preferred_time,
            n.seats_needed,
            n.message,
        );
        request.status = status;
        request
    }

    #[tokio::test]
    async fn test_create_request_sets_ttl() {
        let mut request_repo = MockPrivateRequestRepository::new();
        request_repo.expect_create().times(1).returning(|_| Ok(()));
        let usecase = PrivateRequestsUseCase::new(request_repo, MockRideRepository::new());

        let request = usecase
            .create_request(Uuid::new_v4(), "Asha".to_string(), new_request())
            .await
            .unwrap();

        assert_eq!(request.status, PrivateRequestStatus::Active);
        assert_eq!(
            request.expires_at - request.created_at,
            chrono::Duration::hours(24)
        );
    }

    #[tokio::test]
    async fn test_nearby_drops_requests_past_their_expiry() {
        let mut request_repo = MockPrivateRequestRepository::new();
        let user_id = Uuid::new_v4();
        let fresh = make_request(Uuid::new_v4(), PrivateRequestStatus::Active);
        let mut stale = make_request(Uuid::new_v4(), PrivateRequestStatus::Active);
        stale.expires_at = Utc::now() - chrono::Duration::minutes(5);
        let fresh_id = fresh.id;

        let rows = vec![fresh, stale];
        request_repo
            .expect_list_open_excluding()
            .times(1)
            .returning(move |_, _| Ok(rows.clone()));

        let usecase = PrivateRequestsUseCase::new(request_repo, MockRideRepository::new());
        let requests = usecase.nearby_requests(user_id).await.unwrap();

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, fresh_id);
    }

    #[tokio::test]
    async fn test_respond_materializes_linked_ride_at_zero_price() {
        let mut request_repo = MockPrivateRequestRepository::new();
        let mut ride_repo = MockRideRepository::new();
        let request = make_request(Uuid::new_v4(), PrivateRequestStatus::Active);
        let request_id = request.id;
        let driver_id = Uuid::new_v4();
        let request_clone = request.clone();

        request_repo
            .expect_find_by_id()
            .with(eq(request_id))
            .times(1)
            .returning(move |_| Ok(Some(request_clone.clone())));
        request_repo
            .expect_mark_responded_if_active()
            .times(1)
            .returning(|_, _, _| Ok(true));
        ride_repo.expect_create().times(1).returning(|_| Ok(()));

        let usecase = PrivateRequestsUseCase::new(request_repo, ride_repo);
        let (updated, ride) = usecase
            .respond(driver_id, "Ravi".to_string(), request_id)
            .await
            .unwrap();

        assert_eq!(updated.status, PrivateRequestStatus::Responded);
        assert_eq!(updated.responded_by, Some(driver_id));
        assert_eq!(updated.ride_offer_id, Some(ride.id));
        assert_eq!(ride.price_per_seat, 0.0);
        assert_eq!(ride.available_seats, request.seats_needed);
        assert_eq!(ride.from_private_request, Some(request_id));
    }

    #[tokio::test]
    async fn test_respond_rejects_own_request() {
        let mut request_repo = MockPrivateRequestRepository::new();
        let passenger_id = Uuid::new_v4();
        let request = make_request(passenger_id, PrivateRequestStatus::Active);
        let request_id = request.id;
        let request_clone = request.clone();
        request_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(request_clone.clone())));

        let usecase = PrivateRequestsUseCase::new(request_repo, MockRideRepository::new());
        let result = usecase
            .respond(passenger_id, "Asha".to_string(), request_id)
            .await;

        assert!(matches!(result, Err(UsecaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_respond_fails_on_already_responded_request() {
        let mut request_repo = MockPrivateRequestRepository::new();
        let mut request = make_request(Uuid::new_v4(), PrivateRequestStatus::Responded);
        request.responded_by = Some(Uuid::new_v4());
        let request_id = request.id;
        let request_clone = request.clone();
        request_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(request_clone.clone())));

        let usecase = PrivateRequestsUseCase::new(request_repo, MockRideRepository::new());
        let result = usecase
            .respond(Uuid::new_v4(), "Ravi".to_string(), request_id)
            .await;

        assert!(matches!(result, Err(UsecaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_respond_lost_claim_race_creates_no_ride() {
        let mut request_repo = MockPrivateRequestRepository::new();
        let ride_repo = MockRideRepository::new();
        let request = make_request(Uuid::new_v4(), PrivateRequestStatus::Active);
        let request_id = request.id;
        let request_clone = request.clone();

        request_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(request_clone.clone())));
        request_repo
            .expect_mark_responded_if_active()
            .times(1)
            .returning(|_, _, _| Ok(false));
        // No ride_repo.create expectation: calling it would panic.

        let usecase = PrivateRequestsUseCase::new(request_repo, ride_repo);
        let result = usecase
            .respond(Uuid::new_v4(), "Ravi".to_string(), request_id)
            .await;

        assert!(matches!(result, Err(UsecaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cancel_is_passenger_only() {
        let mut request_repo = MockPrivateRequestRepository::new();
        let request = make_request(Uuid::new_v4(), PrivateRequestStatus::Active);
        let request_id = request.id;
        let request_clone = request.clone();
        request_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(request_clone.clone())));

        let usecase = PrivateRequestsUseCase::new(request_repo, MockRideRepository::new());
        let result = usecase.cancel(Uuid::new_v4(), request_id).await;

        assert!(matches!(result, Err(UsecaseError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_cancel_success() {
        let mut request_repo = MockPrivateRequestRepository::new();
        let passenger_id = Uuid::new_v4();
        let request = make_request(passenger_id, PrivateRequestStatus::Active);
        let request_id = request.id;
        let request_clone = request.clone();

        request_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(request_clone.clone())));
        request_repo
            .expect_set_status()
            .with(eq(request_id), eq(PrivateRequestStatus::Cancelled))
            .times(1)
            .returning(|_, _| Ok(()));

        let usecase = PrivateRequestsUseCase::new(request_repo, MockRideRepository::new());
        let result = usecase.cancel(passenger_id, request_id).await;

        assert!(result.is_ok());
    }
}
