//! Consultation sessions and their append-only timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A conversation session between a patient and the assistant.
///
/// `summary` and `summary_embedding` are rewritten by memory consolidation;
/// `updated_at` moves only on creation and summary writes, so it doubles as
/// the "last summarized" marker. `last_condition_check_at` is advanced by
/// condition reconciliation and never moves backward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub heading: String,
    /// Optional link to a prior consultation of the same user.
    pub reference: Option<Uuid>,
    pub summary: String,
    #[serde(skip)]
    pub summary_embedding: Option<Vec<f32>>,
    pub last_condition_check_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Consultation {
    pub fn new(user_id: Uuid, heading: impl Into<String>, reference: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            heading: heading.into(),
            reference,
            summary: String::new(),
            summary_embedding: None,
            last_condition_check_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request payload for opening a consultation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConsultationRequest {
    pub heading: String,
    #[serde(default)]
    pub reference: Option<Uuid>,
}

/// One query/response turn inside a consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub consultation_id: Uuid,
    pub user_query: String,
    pub model_response: String,
    /// Compressed clinical insight; absent for trivial turns.
    pub insights: Option<String>,
    #[serde(skip)]
    pub insight_embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl TimelineEntry {
    pub fn new(
        consultation_id: Uuid,
        user_query: impl Into<String>,
        model_response: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            consultation_id,
            user_query: user_query.into(),
            model_response: model_response.into(),
            insights: None,
            insight_embedding: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_insight(mut self, text: String, embedding: Vec<f32>) -> Self {
        self.insights = Some(text);
        self.insight_embedding = Some(embedding);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_consultation_starts_unsummarized() {
        let c = Consultation::new(Uuid::now_v7(), "Follow-up", None);
        assert!(c.summary.is_empty());
        assert!(c.summary_embedding.is_none());
        assert_eq!(c.created_at, c.updated_at);
        assert_eq!(c.last_condition_check_at, c.created_at);
    }

    #[test]
    fn test_embeddings_are_not_serialized() {
        let entry = TimelineEntry::new(Uuid::now_v7(), "q", "r")
            .with_insight("insight".to_string(), vec![0.1, 0.2]);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["insights"], "insight");
        assert!(json.get("insight_embedding").is_none());
    }

    #[test]
    fn test_create_request_reference_defaults_to_none() {
        let req: CreateConsultationRequest =
            serde_json::from_str(r#"{"heading": "Cough"}"#).unwrap();
        assert!(req.reference.is_none());
    }
}
