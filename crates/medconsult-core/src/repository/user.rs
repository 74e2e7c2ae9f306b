//! User repository trait definition.

use uuid::Uuid;

use medconsult_types::error::RepositoryError;
use medconsult_types::user::{UpdateUserRequest, User};

/// Repository trait for patient persistence.
pub trait UserRepository: Send + Sync {
    /// Create a new user. Fails with `Conflict` if the email is taken.
    fn create_user(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    fn get_user(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn get_user_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Change name and/or email. Returns `NotFound` if the user does not exist.
    fn update_user(
        &self,
        id: &Uuid,
        update: &UpdateUserRequest,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    /// Delete a user and, by cascade, everything they own.
    fn delete_user(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
