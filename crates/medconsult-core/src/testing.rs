//! In-memory fakes shared by the core unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use medconsult_types::condition::{Condition, ConditionType, ConditionUpdate, SourceType};
use medconsult_types::consultation::{Consultation, TimelineEntry};
use medconsult_types::error::{EmbeddingError, RepositoryError};
use medconsult_types::llm::{CompletionRequest, CompletionResponse, LlmError, StopReason, Usage};
use medconsult_types::user::{UpdateUserRequest, User};
use medconsult_types::vitals::{VitalsEntry, VitalsQuery};

use crate::memory::embedder::Embedder;
use crate::llm::provider::LlmProvider;
use crate::repository::condition::ConditionRepository;
use crate::repository::consultation::ConsultationRepository;
use crate::repository::timeline::TimelineRepository;
use crate::repository::user::UserRepository;
use crate::repository::vitals::VitalsRepository;
use crate::vector::rank_by_distance;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    users: HashMap<Uuid, User>,
    consultations: HashMap<Uuid, Consultation>,
    timeline: Vec<TimelineEntry>,
    conditions: Vec<Condition>,
    vitals: Vec<VitalsEntry>,
}

/// One shared in-memory store implementing every repository trait.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    pub fn seed_user(&self) -> User {
        let user = User::new("Test Patient", format!("{}@example.com", Uuid::now_v7()));
        self.with(|s| s.users.insert(user.id, user.clone()));
        user
    }

    pub fn seed_consultation(&self, user_id: Uuid, heading: &str) -> Consultation {
        let consultation = Consultation::new(user_id, heading, None);
        self.with(|s| s.consultations.insert(consultation.id, consultation.clone()));
        consultation
    }

    /// Insert a summarized consultation with a fixed vector.
    pub fn seed_summarized_consultation(
        &self,
        user_id: Uuid,
        heading: &str,
        summary: &str,
        vector: Vec<f32>,
    ) -> Consultation {
        let mut consultation = Consultation::new(user_id, heading, None);
        consultation.summary = summary.to_string();
        consultation.summary_embedding = Some(vector);
        self.with(|s| s.consultations.insert(consultation.id, consultation.clone()));
        consultation
    }

    pub fn seed_condition(
        &self,
        user_id: Uuid,
        name: &str,
        is_active: bool,
        vector: Option<Vec<f32>>,
    ) -> Condition {
        let now = Utc::now();
        let condition = Condition {
            id: Uuid::now_v7(),
            user_id,
            source_type: SourceType::UserReport,
            consultation_id: None,
            condition_type: ConditionType::Condition,
            condition_name: name.to_string(),
            icd_code: None,
            diagnosis_date: None,
            is_active,
            notes: format!("{name} noted by patient"),
            certainty: None,
            embedding: vector,
            created_at: now,
            updated_at: now,
        };
        self.with(|s| s.conditions.push(condition.clone()));
        condition
    }

    /// Append `n` entries with strictly increasing timestamps after `start`.
    pub fn seed_entries(&self, consultation_id: Uuid, start: DateTime<Utc>, n: usize) {
        self.with(|s| {
            for i in 0..n {
                let mut entry = TimelineEntry::new(
                    consultation_id,
                    format!("question {i}"),
                    format!("answer {i}"),
                );
                entry.created_at = start + Duration::milliseconds(i as i64 + 1);
                s.timeline.push(entry);
            }
        });
    }

    pub fn consultation(&self, id: Uuid) -> Consultation {
        self.with(|s| s.consultations[&id].clone())
    }

    pub fn conditions_of(&self, user_id: Uuid) -> Vec<Condition> {
        self.with(|s| {
            s.conditions
                .iter()
                .filter(|c| c.user_id == user_id)
                .cloned()
                .collect()
        })
    }

    pub fn entries_of(&self, consultation_id: Uuid) -> Vec<TimelineEntry> {
        self.with(|s| sorted_entries(&s.timeline, consultation_id))
    }
}

fn sorted_entries(timeline: &[TimelineEntry], consultation_id: Uuid) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = timeline
        .iter()
        .filter(|e| e.consultation_id == consultation_id)
        .cloned()
        .collect();
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    entries
}

impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<User, RepositoryError> {
        self.with(|s| {
            if s.users.values().any(|u| u.email == user.email) {
                return Err(RepositoryError::Conflict(format!(
                    "email '{}' already registered",
                    user.email
                )));
            }
            s.users.insert(user.id, user.clone());
            Ok(user.clone())
        })
    }

    async fn get_user(&self, id: &Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.with(|s| s.users.get(id).cloned()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.with(|s| s.users.values().find(|u| u.email == email).cloned()))
    }

    async fn update_user(
        &self,
        id: &Uuid,
        update: &UpdateUserRequest,
    ) -> Result<User, RepositoryError> {
        self.with(|s| {
            let user = s.users.get_mut(id).ok_or(RepositoryError::NotFound)?;
            user.apply(update.clone());
            Ok(user.clone())
        })
    }

    async fn delete_user(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        Ok(self.with(|s| s.users.remove(id).is_some()))
    }
}

impl ConsultationRepository for MemoryStore {
    async fn create_consultation(
        &self,
        consultation: &Consultation,
    ) -> Result<Consultation, RepositoryError> {
        self.with(|s| s.consultations.insert(consultation.id, consultation.clone()));
        Ok(consultation.clone())
    }

    async fn get_consultation(&self, id: &Uuid) -> Result<Option<Consultation>, RepositoryError> {
        Ok(self.with(|s| s.consultations.get(id).cloned()))
    }

    async fn list_consultations(
        &self,
        user_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<Consultation>, RepositoryError> {
        Ok(self.with(|s| {
            let activity = |c: &Consultation| {
                s.timeline
                    .iter()
                    .filter(|e| e.consultation_id == c.id)
                    .map(|e| e.created_at)
                    .fold(c.updated_at, std::cmp::max)
            };
            let mut list: Vec<(DateTime<Utc>, Consultation)> = s
                .consultations
                .values()
                .filter(|c| c.user_id == *user_id)
                .map(|c| (activity(c), c.clone()))
                .collect();
            list.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.id.cmp(&a.1.id)));
            list.truncate(limit as usize);
            list.into_iter().map(|(_, c)| c).collect()
        }))
    }

    async fn update_summary(
        &self,
        id: &Uuid,
        summary: &str,
        embedding: &[f32],
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.with(|s| {
            let c = s.consultations.get_mut(id).ok_or(RepositoryError::NotFound)?;
            c.summary = summary.to_string();
            c.summary_embedding = Some(embedding.to_vec());
            c.updated_at = at;
            Ok(())
        })
    }

    async fn advance_condition_check(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        self.with(|s| {
            let c = s.consultations.get_mut(id).ok_or(RepositoryError::NotFound)?;
            c.last_condition_check_at = c.last_condition_check_at.max(at);
            Ok(c.last_condition_check_at)
        })
    }

    async fn nearest_consultations(
        &self,
        user_id: &Uuid,
        exclude_id: Option<Uuid>,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> Result<Vec<(Consultation, f32)>, RepositoryError> {
        let candidates: Vec<Consultation> = self.with(|s| {
            s.consultations
                .values()
                .filter(|c| c.user_id == *user_id && Some(c.id) != exclude_id)
                .cloned()
                .collect()
        });
        Ok(rank_by_distance(query, candidates, k, max_distance))
    }
}

impl TimelineRepository for MemoryStore {
    async fn append_entry(&self, entry: &TimelineEntry) -> Result<TimelineEntry, RepositoryError> {
        self.with(|s| s.timeline.push(entry.clone()));
        Ok(entry.clone())
    }

    async fn recent_entries(
        &self,
        consultation_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<TimelineEntry>, RepositoryError> {
        let mut entries = self.with(|s| sorted_entries(&s.timeline, *consultation_id));
        entries.reverse();
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn entries_since(
        &self,
        consultation_id: &Uuid,
        after: DateTime<Utc>,
    ) -> Result<Vec<TimelineEntry>, RepositoryError> {
        let entries = self.with(|s| sorted_entries(&s.timeline, *consultation_id));
        Ok(entries.into_iter().filter(|e| e.created_at > after).collect())
    }

    async fn count_since(
        &self,
        consultation_id: &Uuid,
        after: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        Ok(self.entries_since(consultation_id, after).await?.len() as u64)
    }

    async fn list_entries(
        &self,
        consultation_id: &Uuid,
    ) -> Result<Vec<TimelineEntry>, RepositoryError> {
        Ok(self.with(|s| sorted_entries(&s.timeline, *consultation_id)))
    }
}

impl ConditionRepository for MemoryStore {
    async fn create_condition(&self, condition: &Condition) -> Result<Condition, RepositoryError> {
        condition
            .validate()
            .map_err(RepositoryError::Conflict)?;
        self.with(|s| s.conditions.push(condition.clone()));
        Ok(condition.clone())
    }

    async fn get_condition(&self, id: &Uuid) -> Result<Option<Condition>, RepositoryError> {
        Ok(self.with(|s| s.conditions.iter().find(|c| c.id == *id).cloned()))
    }

    async fn list_conditions(
        &self,
        user_id: &Uuid,
        active_only: bool,
    ) -> Result<Vec<Condition>, RepositoryError> {
        Ok(self
            .conditions_of(*user_id)
            .into_iter()
            .filter(|c| !active_only || c.is_active)
            .collect())
    }

    async fn update_condition(
        &self,
        id: &Uuid,
        update: &ConditionUpdate,
    ) -> Result<Condition, RepositoryError> {
        self.with(|s| {
            let c = s
                .conditions
                .iter_mut()
                .find(|c| c.id == *id)
                .ok_or(RepositoryError::NotFound)?;
            c.is_active = update.is_active;
            c.notes = update.notes.clone();
            if update.icd_code.is_some() {
                c.icd_code = update.icd_code.clone();
            }
            c.updated_at = Utc::now();
            Ok(c.clone())
        })
    }

    async fn nearest_conditions(
        &self,
        user_id: &Uuid,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> Result<Vec<(Condition, f32)>, RepositoryError> {
        Ok(rank_by_distance(query, self.conditions_of(*user_id), k, max_distance))
    }
}

impl VitalsRepository for MemoryStore {
    async fn record_vital(&self, entry: &VitalsEntry) -> Result<VitalsEntry, RepositoryError> {
        self.with(|s| s.vitals.push(entry.clone()));
        Ok(entry.clone())
    }

    async fn query_vitals(
        &self,
        user_id: &Uuid,
        query: &VitalsQuery,
    ) -> Result<Vec<VitalsEntry>, RepositoryError> {
        Ok(self.with(|s| {
            let mut list: Vec<VitalsEntry> = s
                .vitals
                .iter()
                .filter(|v| v.user_id == *user_id)
                .filter(|v| query.metric.as_deref().is_none_or(|m| v.metric_name == m))
                .filter(|v| query.from.is_none_or(|from| v.recorded_at >= from))
                .filter(|v| query.to.is_none_or(|to| v.recorded_at <= to))
                .cloned()
                .collect();
            list.sort_by_key(|v| v.recorded_at);
            list
        }))
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Which pipeline step a completion request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Consultation,
    Insight,
    Detection,
    Summary,
}

impl CallKind {
    fn of(request: &CompletionRequest) -> Self {
        match request.output_config.as_ref().map(|c| c.format.json_schema.name.as_str()) {
            Some("TurnInsight") => CallKind::Insight,
            Some("DetectedActions") => CallKind::Detection,
            _ if request
                .messages
                .iter()
                .any(|m| m.content.contains("NEW CUMULATIVE SUMMARY")) =>
            {
                CallKind::Summary
            }
            _ => CallKind::Consultation,
        }
    }
}

#[derive(Default)]
struct ScriptState {
    queued: HashMap<CallKind, VecDeque<Result<String, LlmError>>>,
    calls: Vec<(CallKind, CompletionRequest)>,
}

/// Generation provider answering per call kind from scripted queues.
///
/// When a kind's queue is empty a benign default is returned.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, kind: CallKind, response: Result<String, LlmError>) {
        let mut state = self.state.lock().unwrap();
        state.queued.entry(kind).or_default().push_back(response);
    }

    pub fn push_ok(&self, kind: CallKind, content: &str) {
        self.push(kind, Ok(content.to_string()));
    }

    pub fn calls(&self, kind: CallKind) -> usize {
        let state = self.state.lock().unwrap();
        state.calls.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn last_request(&self, kind: CallKind) -> Option<CompletionRequest> {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .map(|(_, r)| r.clone())
    }

    fn default_for(kind: CallKind) -> String {
        match kind {
            CallKind::Consultation => "Based on your records, please keep monitoring.".to_string(),
            CallKind::Insight => serde_json::json!({
                "insight_found": false,
                "compressed_summary": "",
                "primary_condition_or_symptom": "",
                "icd_codes_extracted": []
            })
            .to_string(),
            CallKind::Detection => r#"{"actions": []}"#.to_string(),
            CallKind::Summary => "Patient discussed ongoing symptoms.".to_string(),
        }
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let kind = CallKind::of(request);
        let next = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((kind, request.clone()));
            state.queued.get_mut(&kind).and_then(|q| q.pop_front())
        };
        let content = match next {
            Some(result) => result?,
            None => Self::default_for(kind),
        };
        Ok(CompletionResponse {
            id: Uuid::now_v7().to_string(),
            content,
            model: "scripted-model".to_string(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        })
    }
}

/// Deterministic bag-of-words embedder with optional fixed vectors.
#[derive(Clone)]
pub struct HashEmbedder {
    dimension: usize,
    fixed: Arc<Mutex<HashMap<String, Vec<f32>>>>,
    fail_on: Option<String>,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fixed: Arc::default(),
            fail_on: None,
        }
    }

    /// Fail any batch containing a text with this substring.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn fix(&self, text: &str, vector: Vec<f32>) {
        self.fixed.lock().unwrap().insert(text.to_string(), vector);
    }

    fn hash_vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dimension];
        for token in text.split_whitespace() {
            let mut h: u64 = 0xcbf29ce484222325;
            for b in token.to_lowercase().bytes() {
                h ^= u64::from(b);
                h = h.wrapping_mul(0x100000001b3);
            }
            v[(h % self.dimension as u64) as usize] += 1.0;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if let Some(needle) = &self.fail_on {
            if texts.iter().any(|t| t.contains(needle.as_str())) {
                return Err(EmbeddingError::Unavailable("connection refused".to_string()));
            }
        }
        let fixed = self.fixed.lock().unwrap();
        Ok(texts
            .iter()
            .map(|t| fixed.get(t).cloned().unwrap_or_else(|| self.hash_vector(t)))
            .collect())
    }

    fn model_name(&self) -> &str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
