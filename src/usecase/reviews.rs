use uuid::Uuid;

use crate::domain::review::{round_rating, Review};
use crate::domain::ride::RideStatus;
use crate::usecase::contracts::{
    BookingRepository, ReviewRepository, RideRepository, UserRepository,
};
use crate::usecase::error::UsecaseError;

pub struct ReviewsUseCase<Rv, R, B, U>
where
    Rv: ReviewRepository,
    R: RideRepository,
    B: BookingRepository,
    U: UserRepository,
{
    review_repository: Rv,
    ride_repository: R,
    booking_repository: B,
    user_repository: U,
}

impl<Rv, R, B, U> ReviewsUseCase<Rv, R, B, U>
where
    Rv: ReviewRepository,
    R: RideRepository,
    B: BookingRepository,
    U: UserRepository,
{
    pub fn new(
        review_repository: Rv,
        ride_repository: R,
        booking_repository: B,
        user_repository: U,
    ) -> Self {
        Self {
            review_repository,
            ride_repository,
            booking_repository,
            user_repository,
        }
    }

    /// Reviews are gated on a completed ride and on participation: the
    /// reviewer must be the ride's driver or hold a completed booking on
    /// it. On success the reviewee's aggregate rating is recomputed from
    /// the full review history, not patched incrementally.
    #[tracing::instrument(skip(self, comment), fields(reviewer_id = %reviewer_id, ride_id = %ride_id, reviewee_id = %reviewee_id, rating))]
    pub async fn create_review(
        &self,
        reviewer_id: Uuid,
        reviewer_name: String,
        ride_id: Uuid,
        reviewee_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> Result<Review, UsecaseError> {
        tracing::debug!("creating review");

        if !(1..=5).contains(&rating) {
            return Err(UsecaseError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let ride = self
            .ride_repository
            .find_by_id(ride_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("Ride".to_string()))?;

        if ride.status != RideStatus::Completed {
            return Err(UsecaseError::InvalidState(
                "Can only review completed rides".to_string(),
            ));
        }

        let is_driver = ride.driver_id == reviewer_id;
        if !is_driver {
            let booking = self
                .booking_repository
                .find_completed_for_participant(ride_id, reviewer_id)
                .await?;
            if booking.is_none() {
                tracing::warn!("review attempt by non-participant");
                return Err(UsecaseError::Forbidden(
                    "You were not part of this ride".to_string(),
                ));
            }
        }

        if self
            .review_repository
            .exists(ride_id, reviewer_id, reviewee_id)
            .await?
        {
            return Err(UsecaseError::Conflict(
                "Already reviewed this user for this ride".to_string(),
            ));
        }

        let review = Review::new(
            ride_id,
            reviewer_id,
            reviewer_name,
            reviewee_id,
            rating,
            comment,
        );
        self.review_repository.create(&review).await.map_err(|e| {
            match UsecaseError::from(e) {
                // The (ride, reviewer, reviewee) unique index fired.
                UsecaseError::Conflict(_) => UsecaseError::Conflict(
                    "Already reviewed this user for this ride".to_string(),
                ),
                other => other,
            }
        })?;

        let (mean, count) = self
            .review_repository
            .aggregate_for_reviewee(reviewee_id)
            .await?;
        self.user_repository
            .set_rating_summary(reviewee_id, round_rating(mean), count)
            .await?;

        tracing::info!(review_id = %review.id, mean, count, "review created, aggregate updated");
        Ok(review)
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn reviews_for_user(&self, user_id: Uuid) -> Result<Vec<Review>, UsecaseError> {
        tracing::debug!("listing reviews for user");

        let reviews = self.review_repository.list_for_reviewee(user_id).await?;

        tracing::debug!(count = reviews.len(), "reviews listed");
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::booking::{Booking, BookingStatus};
    use crate::domain::ride::{Itinerary, Ride};
    use crate::usecase::contracts::{
        MockBookingRepository, MockReviewRepository, MockRideRepository, MockUserRepository,
    };
    use chrono::NaiveDate;
    use mockall::predicate::eq;

    fn make_ride(driver_id: Uuid, status: RideStatus) -> Ride {
        let mut ride = Ride::new(
            driver_id,
            "Ravi".to_string(),
            Itinerary {
                pickup_location: "Indiranagar".to_string(),
                pickup_lat: 12.97,
                pickup_lng: 77.64,
                drop_location: "Whitefield".to_string(),
                drop_lat: 12.96,
                drop_lng: 77.75,
                date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                time: "09:00".to_string(),
            },
            4,
            100.0,
            None,
        );
        ride.status = status;
        ride
    }

    fn completed_booking(ride: &Ride, passenger_id: Uuid) -> Booking {
        let mut booking = Booking::new(passenger_id, "Asha".to_string(), ride, 1, None);
        booking.status = BookingStatus::Completed;
        booking
    }

    #[tokio::test]
    async fn test_driver_review_recomputes_aggregate() {
        let mut review_repo = MockReviewRepository::new();
        let mut ride_repo = MockRideRepository::new();
        let mut user_repo = MockUserRepository::new();
        let driver_id = Uuid::new_v4();
        let reviewee_id = Uuid::new_v4();
        let ride = make_ride(driver_id, RideStatus::Completed);
        let ride_id = ride.id;
        let ride_clone = ride.clone();

        ride_repo
            .expect_find_by_id()
            .with(eq(ride_id))
            .times(1)
            .returning(move |_| Ok(Some(ride_clone.clone())));
        review_repo
            .expect_exists()
            .times(1)
            .returning(|_, _, _| Ok(false));
        review_repo.expect_create().times(1).returning(|_| Ok(()));
        // Three reviews of 5, 4, 5: mean 4.666..., stored as 4.7.
        review_repo
            .expect_aggregate_for_reviewee()
            .with(eq(reviewee_id))
            .times(1)
            .returning(|_| Ok((14.0 / 3.0, 3)));
        user_repo
            .expect_set_rating_summary()
            .with(eq(reviewee_id), eq(4.7), eq(3))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let usecase = ReviewsUseCase::new(
            review_repo,
            ride_repo,
            MockBookingRepository::new(),
            user_repo,
        );
        let review = usecase
            .create_review(driver_id, "Ravi".to_string(), ride_id, reviewee_id, 5, None)
            .await
            .unwrap();

        assert_eq!(review.rating, 5);
        assert_eq!(review.reviewee_id, reviewee_id);
    }

    #[tokio::test]
    async fn test_passenger_with_completed_booking_can_review() {
        let mut review_repo = MockReviewRepository::new();
        let mut ride_repo = MockRideRepository::new();
        let mut booking_repo = MockBookingRepository::new();
        let mut user_repo = MockUserRepository::new();
        let ride = make_ride(Uuid::new_v4(), RideStatus::Completed);
        let ride_id = ride.id;
        let passenger_id = Uuid::new_v4();
        let reviewee_id = ride.driver_id;
        let booking = completed_booking(&ride, passenger_id);
        let ride_clone = ride.clone();

        ride_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(ride_clone.clone())));
        booking_repo
            .expect_find_completed_for_participant()
            .with(eq(ride_id), eq(passenger_id))
            .times(1)
            .returning(move |_, _| Ok(Some(booking.clone())));
        review_repo
            .expect_exists()
            .times(1)
            .returning(|_, _, _| Ok(false));
        review_repo.expect_create().times(1).returning(|_| Ok(()));
        review_repo
            .expect_aggregate_for_reviewee()
            .times(1)
            .returning(|_| Ok((4.0, 1)));
        user_repo
            .expect_set_rating_summary()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let usecase = ReviewsUseCase::new(review_repo, ride_repo, booking_repo, user_repo);
        let result = usecase
            .create_review(
                passenger_id,
                "Asha".to_string(),
                ride_id,
                reviewee_id,
                4,
                Some("Good driver".to_string()),
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_review_requires_completed_ride() {
        let mut ride_repo = MockRideRepository::new();
        let driver_id = Uuid::new_v4();
        let ride = make_ride(driver_id, RideStatus::Active);
        let ride_id = ride.id;
        let ride_clone = ride.clone();
        ride_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(ride_clone.clone())));

        let usecase = ReviewsUseCase::new(
            MockReviewRepository::new(),
            ride_repo,
            MockBookingRepository::new(),
            MockUserRepository::new(),
        );
        let result = usecase
            .create_review(
                driver_id,
                "Ravi".to_string(),
                ride_id,
                Uuid::new_v4(),
                5,
                None,
            )
            .await;

        assert!(matches!(result, Err(UsecaseError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_non_participant_cannot_review() {
        let mut ride_repo = MockRideRepository::new();
        let mut booking_repo = MockBookingRepository::new();
        let ride = make_ride(Uuid::new_v4(), RideStatus::Completed);
        let ride_id = ride.id;
        let ride_clone = ride.clone();

        ride_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(ride_clone.clone())));
        booking_repo
            .expect_find_completed_for_participant()
            .times(1)
            .returning(|_, _| Ok(None));

        let usecase = ReviewsUseCase::new(
            MockReviewRepository::new(),
            ride_repo,
            booking_repo,
            MockUserRepository::new(),
        );
        let result = usecase
            .create_review(
                Uuid::new_v4(),
                "Mallory".to_string(),
                ride_id,
                Uuid::new_v4(),
                5,
                None,
            )
            .await;

        assert!(matches!(result, Err(UsecaseError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_duplicate_review_is_a_conflict() {
        let mut review_repo = MockReviewRepository::new();
        let mut ride_repo = MockRideRepository::new();
        let driver_id = Uuid::new_v4();
        let ride = make_ride(driver_id, RideStatus::Completed);
        let ride_id = ride.id;
        let ride_clone = ride.clone();

        ride_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(ride_clone.clone())));
        review_repo
            .expect_exists()
            .times(1)
            .returning(|_, _, _| Ok(true));

        let usecase = ReviewsUseCase::new(
            review_repo,
            ride_repo,
            MockBookingRepository::new(),
            MockUserRepository::new(),
        );
        let result = usecase
            .create_review(
                driver_id,
                "Ravi".to_string(),
                ride_id,
                Uuid::new_v4(),
                4,
                None,
            )
            .await;

        assert!(matches!(result, Err(UsecaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_rating_out_of_range_is_rejected() {
        let usecase = ReviewsUseCase::new(
            MockReviewRepository::new(),
            MockRideRepository::new(),
            MockBookingRepository::new(),
            MockUserRepository::new(),
        );

        for rating in [0, 6] {
            let result = usecase
                .create_review(
                    Uuid::new_v4(),
                    "Asha".to_string(),
                    Uuid::new_v4(),
                    Uuid::new_v4(),
                    rating,
                    None,
                )
                .await;
            assert!(matches!(result, Err(UsecaseError::Validation(_))));
        }
    }
}
