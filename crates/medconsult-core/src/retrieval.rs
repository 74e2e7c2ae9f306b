//! Thresholded similarity retrieval over a user's history.
//!
//! Two record kinds are searched independently -- conditions and prior
//! consultation summaries -- each filtered by the similarity threshold and
//! capped at the per-kind over-fetch bound. The union is re-ranked by
//! distance (ties by id) and truncated to the final chunk limit. Fewer
//! results than the limit are returned as-is; low-relevance records are
//! never used as padding.

use uuid::Uuid;

use medconsult_types::condition::Condition;
use medconsult_types::config::RetrievalConfig;
use medconsult_types::consultation::Consultation;
use medconsult_types::error::ConsultError;
use medconsult_types::retrieval::{ContextRecord, RecordKind};

use crate::repository::condition::ConditionRepository;
use crate::repository::consultation::ConsultationRepository;
use crate::vector::by_distance_then_id;

/// Retrieval over borrowed repositories.
pub struct RetrievalEngine<'a, C, K> {
    consultations: &'a C,
    conditions: &'a K,
    config: &'a RetrievalConfig,
}

impl<'a, C, K> RetrievalEngine<'a, C, K>
where
    C: ConsultationRepository,
    K: ConditionRepository,
{
    pub fn new(consultations: &'a C, conditions: &'a K, config: &'a RetrievalConfig) -> Self {
        Self {
            consultations,
            conditions,
            config,
        }
    }

    /// Most relevant historical records for `query`, best first.
    #[tracing::instrument(
        name = "retrieve_context",
        skip(self, query),
        fields(user_id = %user_id, dimension = query.len())
    )]
    pub async fn retrieve(
        &self,
        user_id: &Uuid,
        exclude_consultation: Option<Uuid>,
        query: &[f32],
    ) -> Result<Vec<ContextRecord>, ConsultError> {
        let max_distance = self.config.max_distance();
        let k = self.config.per_kind_limit;

        let conditions = self
            .conditions
            .nearest_conditions(user_id, query, k, max_distance)
            .await?;
        let consultations = self
            .consultations
            .nearest_consultations(user_id, exclude_consultation, query, k, max_distance)
            .await?;

        let records = merge_ranked(
            conditions,
            consultations,
            self.config.similarity_threshold,
            self.config.max_context_chunks,
        );
        tracing::debug!(returned = records.len(), "retrieved historical context");
        Ok(records)
    }
}

/// Merge per-kind `(record, distance)` results into the final context list.
///
/// Re-applies the strict `similarity > threshold` filter so the guarantee
/// holds regardless of how the repositories filtered.
pub fn merge_ranked(
    conditions: Vec<(Condition, f32)>,
    consultations: Vec<(Consultation, f32)>,
    similarity_threshold: f32,
    max_chunks: usize,
) -> Vec<ContextRecord> {
    let mut merged: Vec<(f32, ContextRecord)> = conditions
        .into_iter()
        .map(|(c, d)| (d, condition_record(&c, d)))
        .chain(
            consultations
                .into_iter()
                .map(|(c, d)| (d, consultation_record(&c, d))),
        )
        .filter(|(_, r)| r.similarity > similarity_threshold)
        .collect();
    merged.sort_by(|(da, a), (db, b)| by_distance_then_id((*da, a.id), (*db, b.id)));
    merged.truncate(max_chunks);
    merged.into_iter().map(|(_, r)| r).collect()
}

fn condition_record(condition: &Condition, distance: f32) -> ContextRecord {
    let status = if condition.is_active { "active" } else { "resolved" };
    let mut snippet = format!("{} ({}, {status}).", condition.notes.trim(), condition.condition_type);
    if let Some(icd) = &condition.icd_code {
        snippet.push_str(&format!(" ICD-10: {icd}."));
    }
    let date = condition
        .diagnosis_date
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or(condition.created_at);
    ContextRecord {
        kind: RecordKind::Condition,
        id: condition.id,
        title: condition.condition_name.clone(),
        snippet: snippet.trim().to_string(),
        date,
        similarity: 1.0 - distance,
    }
}

fn consultation_record(consultation: &Consultation, distance: f32) -> ContextRecord {
    ContextRecord {
        kind: RecordKind::Consultation,
        id: consultation.id,
        title: consultation.heading.clone(),
        snippet: consultation.summary.clone(),
        date: consultation.updated_at,
        similarity: 1.0 - distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    /// Unit vector at `similarity` to [1, 0].
    fn at_similarity(similarity: f32) -> Vec<f32> {
        vec![similarity, (1.0 - similarity * similarity).sqrt()]
    }

    const QUERY: [f32; 2] = [1.0, 0.0];

    #[tokio::test]
    async fn test_lisinopril_scenario_orders_hypertension_first() {
        let store = MemoryStore::new();
        let user = store.seed_user();
        let current = store.seed_consultation(user.id, "Medication question");
        store.seed_condition(user.id, "Hypertension", true, Some(at_similarity(0.77)));
        store.seed_summarized_consultation(
            user.id,
            "Chest X-Ray",
            "Chest X-ray clear, no consolidation.",
            at_similarity(0.55),
        );

        let config = RetrievalConfig::default();
        let engine = RetrievalEngine::new(&store, &store, &config);
        let records = engine.retrieve(&user.id, Some(current.id), &QUERY).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Hypertension");
        assert_eq!(records[0].kind, RecordKind::Condition);
        assert_eq!(records[1].title, "Chest X-Ray");
        assert!((records[0].similarity - 0.77).abs() < 1e-4);
        assert!((records[1].similarity - 0.55).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_never_more_than_limit_and_all_above_threshold() {
        let store = MemoryStore::new();
        let user = store.seed_user();
        for (i, s) in [0.95, 0.9, 0.85, 0.8, 0.75, 0.7, 0.4, 0.2].iter().enumerate() {
            store.seed_condition(user.id, &format!("c{i}"), true, Some(at_similarity(*s)));
            store.seed_summarized_consultation(user.id, &format!("s{i}"), "summary", at_similarity(*s - 0.01));
        }

        let config = RetrievalConfig::default();
        let engine = RetrievalEngine::new(&store, &store, &config);
        let records = engine.retrieve(&user.id, None, &QUERY).await.unwrap();

        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.similarity > 0.5));
        assert!(records.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[tokio::test]
    async fn test_fewer_than_limit_is_not_padded() {
        let store = MemoryStore::new();
        let user = store.seed_user();
        store.seed_condition(user.id, "Asthma", true, Some(at_similarity(0.6)));
        store.seed_condition(user.id, "Old fracture", false, Some(at_similarity(0.3)));
        store.seed_condition(user.id, "No vector", true, None);

        let config = RetrievalConfig::default();
        let engine = RetrievalEngine::new(&store, &store, &config);
        let records = engine.retrieve(&user.id, None, &QUERY).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Asthma");
    }

    #[tokio::test]
    async fn test_raising_threshold_never_increases_count() {
        let store = MemoryStore::new();
        let user = store.seed_user();
        for (i, s) in [0.99, 0.8, 0.65, 0.55, 0.52].iter().enumerate() {
            store.seed_condition(user.id, &format!("c{i}"), true, Some(at_similarity(*s)));
        }
        let mut previous = usize::MAX;
        for threshold in [0.0, 0.3, 0.5, 0.6, 0.7, 0.9, 0.999] {
            let config = RetrievalConfig {
                similarity_threshold: threshold,
                ..RetrievalConfig::default()
            };
            let engine = RetrievalEngine::new(&store, &store, &config);
            let count = engine.retrieve(&user.id, None, &QUERY).await.unwrap().len();
            assert!(count <= previous, "threshold {threshold} returned {count} > {previous}");
            previous = count;
        }
    }

    #[tokio::test]
    async fn test_current_consultation_and_other_users_excluded() {
        let store = MemoryStore::new();
        let user = store.seed_user();
        let other = store.seed_user();
        let current =
            store.seed_summarized_consultation(user.id, "Current", "ongoing", at_similarity(0.99));
        store.seed_summarized_consultation(other.id, "Someone else", "x", at_similarity(0.99));

        let config = RetrievalConfig::default();
        let engine = RetrievalEngine::new(&store, &store, &config);
        let records = engine.retrieve(&user.id, Some(current.id), &QUERY).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_records_are_skipped() {
        let store = MemoryStore::new();
        let user = store.seed_user();
        store.seed_condition(user.id, "Legacy", true, Some(vec![1.0, 0.0, 0.0]));

        let config = RetrievalConfig::default();
        let engine = RetrievalEngine::new(&store, &store, &config);
        assert!(engine.retrieve(&user.id, None, &QUERY).await.unwrap().is_empty());
    }
}
