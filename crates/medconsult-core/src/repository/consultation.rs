//! Consultation repository trait definition.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use medconsult_types::consultation::Consultation;
use medconsult_types::error::RepositoryError;

/// Repository trait for consultation sessions.
pub trait ConsultationRepository: Send + Sync {
    fn create_consultation(
        &self,
        consultation: &Consultation,
    ) -> impl std::future::Future<Output = Result<Consultation, RepositoryError>> + Send;

    fn get_consultation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Consultation>, RepositoryError>> + Send;

    /// Most recently active first: the later of `updated_at` and the newest turn.
    fn list_consultations(
        &self,
        user_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Consultation>, RepositoryError>> + Send;

    /// Replace the rolling summary and its embedding; sets `updated_at = at`.
    fn update_summary(
        &self,
        id: &Uuid,
        summary: &str,
        embedding: &[f32],
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Advance `last_condition_check_at` to `at` unless it is already later.
    ///
    /// Returns the stored value after the call.
    fn advance_condition_check(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<DateTime<Utc>, RepositoryError>> + Send;

    /// Nearest summarized consultations of a user by cosine distance.
    ///
    /// Excludes `exclude_id`, keeps only distances below `max_distance`,
    /// orders by distance then id, and caps at `k`.
    fn nearest_consultations(
        &self,
        user_id: &Uuid,
        exclude_id: Option<Uuid>,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> impl std::future::Future<Output = Result<Vec<(Consultation, f32)>, RepositoryError>> + Send;
}
