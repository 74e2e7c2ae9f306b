//! Vitals repository trait definition.

use uuid::Uuid;

use medconsult_types::error::RepositoryError;
use medconsult_types::vitals::{VitalsEntry, VitalsQuery};

/// Repository trait for the append-only vitals time series.
pub trait VitalsRepository: Send + Sync {
    fn record_vital(
        &self,
        entry: &VitalsEntry,
    ) -> impl std::future::Future<Output = Result<VitalsEntry, RepositoryError>> + Send;

    /// Matching entries for a user, oldest first. Range bounds are inclusive.
    fn query_vitals(
        &self,
        user_id: &Uuid,
        query: &VitalsQuery,
    ) -> impl std::future::Future<Output = Result<Vec<VitalsEntry>, RepositoryError>> + Send;
}
