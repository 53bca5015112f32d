use uuid::Uuid;

use crate::domain::user::User;
use crate::usecase::contracts::UserRepository;
use crate::usecase::error::UsecaseError;

pub struct UsersUseCase<U>
where
    U: UserRepository,
{
    user_repository: U,
}

impl<U> UsersUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repository: U) -> Self {
        Self { user_repository }
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_profile(&self, user_id: Uuid) -> Result<User, UsecaseError> {
        tracing::debug!("fetching user profile");

        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| UsecaseError::NotFound("User".to_string()))
    }

    /// Removes the user's rides, bookings, requests, chats, reviews and
    /// the user record itself in a single transaction.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete_account(&self, user_id: Uuid) -> Result<(), UsecaseError> {
        tracing::info!("deleting user account");

        self.user_repository.delete_account_data(user_id).await?;

        tracing::info!("user account deleted");
        Ok(())
    }
}
