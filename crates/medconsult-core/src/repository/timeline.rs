//! Timeline repository trait definition.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use medconsult_types::consultation::TimelineEntry;
use medconsult_types::error::RepositoryError;

/// Repository trait for the append-only consultation timeline.
///
/// Ordering by `created_at` (ties broken by id) is significant for every
/// query: it is the replay order for summarization and the recency order
/// for the prompt window.
pub trait TimelineRepository: Send + Sync {
    fn append_entry(
        &self,
        entry: &TimelineEntry,
    ) -> impl std::future::Future<Output = Result<TimelineEntry, RepositoryError>> + Send;

    /// The `limit` newest entries, newest first.
    fn recent_entries(
        &self,
        consultation_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<TimelineEntry>, RepositoryError>> + Send;

    /// Entries created strictly after `after`, oldest first.
    fn entries_since(
        &self,
        consultation_id: &Uuid,
        after: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<TimelineEntry>, RepositoryError>> + Send;

    /// Number of entries created strictly after `after`.
    fn count_since(
        &self,
        consultation_id: &Uuid,
        after: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Full timeline, oldest first.
    fn list_entries(
        &self,
        consultation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<TimelineEntry>, RepositoryError>> + Send;
}
