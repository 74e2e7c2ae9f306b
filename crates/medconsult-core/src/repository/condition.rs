//! Condition repository trait definition.

use uuid::Uuid;

use medconsult_types::condition::{Condition, ConditionUpdate};
use medconsult_types::error::RepositoryError;

/// Repository trait for extracted and reported conditions.
///
/// Conditions are never deleted by the pipeline; reconciliation only adds
/// new rows or changes `is_active`, notes, and ICD code on existing ones.
pub trait ConditionRepository: Send + Sync {
    fn create_condition(
        &self,
        condition: &Condition,
    ) -> impl std::future::Future<Output = Result<Condition, RepositoryError>> + Send;

    fn get_condition(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Condition>, RepositoryError>> + Send;

    /// Oldest first.
    fn list_conditions(
        &self,
        user_id: &Uuid,
        active_only: bool,
    ) -> impl std::future::Future<Output = Result<Vec<Condition>, RepositoryError>> + Send;

    /// Apply an update. Returns `NotFound` if the condition does not exist.
    fn update_condition(
        &self,
        id: &Uuid,
        update: &ConditionUpdate,
    ) -> impl std::future::Future<Output = Result<Condition, RepositoryError>> + Send;

    /// Nearest conditions of a user by cosine distance, filtered by
    /// `max_distance`, ordered by distance then id, capped at `k`.
    fn nearest_conditions(
        &self,
        user_id: &Uuid,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> impl std::future::Future<Output = Result<Vec<(Condition, f32)>, RepositoryError>> + Send;
}
