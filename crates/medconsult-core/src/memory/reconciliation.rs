//! LLM-driven reconciliation of conditions against recent conversation.
//!
//! Once `condition_check_threshold` entries exist strictly after the
//! consultation's `last_condition_check_at`, the model is asked which
//! conditions to add, update, or ignore. The detection output is decoded
//! strictly: a response that does not parse into the action schema aborts
//! the run and leaves the check marker untouched. Individual actions are
//! then validated and applied independently; a bad action is reported and
//! the batch continues. After a
//! successful detection call the marker advances to the newest examined
//! entry whether or not any action applied.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use medconsult_types::condition::{Condition, ConditionUpdate, SourceType};
use medconsult_types::config::MemoryConfig;
use medconsult_types::consultation::Consultation;
use medconsult_types::error::{ConsultError, RepositoryError};
use medconsult_types::llm::{CompletionRequest, Message};
use medconsult_types::memory::{
    ActionError, ConditionAction, ConditionMode, DetectedActions, ReconciliationOutcome,
    ReconciliationReport,
};

use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::structured::{decode, output_config_for, strict_schema};
use crate::memory::box_embedder::BoxEmbedder;
use crate::memory::resolver::ConditionResolver;
use crate::prompt::{detection_prompt, format_new_entries};
use crate::repository::condition::ConditionRepository;
use crate::repository::consultation::ConsultationRepository;
use crate::repository::timeline::TimelineRepository;

const SCHEMA_NAME: &str = "DetectedActions";

/// Detection output: the schema root is `{actions: [...]}`, but a bare list
/// is accepted as well.
#[derive(Deserialize)]
#[serde(untagged)]
enum DetectionPayload {
    Wrapped(DetectedActions),
    Bare(Vec<ConditionAction>),
}

/// Decode detection output, failing closed when it does not match the schema.
///
/// Per-action semantic checks happen later, one action at a time.
pub fn decode_actions(raw: &str) -> Result<Vec<ConditionAction>, ConsultError> {
    Ok(match decode::<DetectionPayload>(raw, "condition actions")? {
        DetectionPayload::Wrapped(wrapped) => wrapped.actions,
        DetectionPayload::Bare(actions) => actions,
    })
}

pub struct ConditionReconciler<'a, C, T, K> {
    consultations: &'a C,
    timeline: &'a T,
    conditions: &'a K,
    provider: &'a BoxLlmProvider,
    embedder: &'a BoxEmbedder,
    config: &'a MemoryConfig,
}

impl<'a, C, T, K> ConditionReconciler<'a, C, T, K>
where
    C: ConsultationRepository,
    T: TimelineRepository,
    K: ConditionRepository,
{
    pub fn new(
        consultations: &'a C,
        timeline: &'a T,
        conditions: &'a K,
        provider: &'a BoxLlmProvider,
        embedder: &'a BoxEmbedder,
        config: &'a MemoryConfig,
    ) -> Self {
        Self {
            consultations,
            timeline,
            conditions,
            provider,
            embedder,
            config,
        }
    }

    /// Run reconciliation if enough new entries have accumulated.
    ///
    /// `health_records_context` is the formatted historical-records block
    /// the model uses to judge novelty.
    #[tracing::instrument(
        name = "reconcile_conditions",
        skip(self, health_records_context),
        fields(consultation_id = %consultation_id)
    )]
    pub async fn reconcile(
        &self,
        consultation_id: &Uuid,
        health_records_context: &str,
    ) -> Result<ReconciliationOutcome, ConsultError> {
        let consultation = self
            .consultations
            .get_consultation(consultation_id)
            .await?
            .ok_or_else(|| ConsultError::not_found("consultation", consultation_id))?;

        let threshold = self.config.condition_check_threshold;
        let since = consultation.last_condition_check_at;
        let pending = self.timeline.count_since(consultation_id, since).await? as usize;
        if pending < threshold {
            tracing::debug!(pending, threshold, "condition check not due");
            return Ok(ReconciliationOutcome::NotDue { pending, threshold });
        }

        let entries = self.timeline.entries_since(consultation_id, since).await?;
        let Some(window_end) = entries.last().map(|e| e.created_at) else {
            return Ok(ReconciliationOutcome::NotDue { pending: 0, threshold });
        };

        let actions = self
            .detect(&consultation, &format_new_entries(&entries), health_records_context)
            .await?;

        let mut report = ReconciliationReport {
            added: Vec::new(),
            updated: Vec::new(),
            ignored: 0,
            errors: Vec::new(),
            checked_at: window_end,
        };
        let mut resolver =
            ConditionResolver::new(self.conditions.list_conditions(&consultation.user_id, false).await?);

        for (index, action) in actions.iter().enumerate() {
            if action.mode == ConditionMode::Ignore {
                report.ignored += 1;
                continue;
            }
            let applied = match (action.validate(), action.mode) {
                (Err(msg), _) => Err(ConsultError::Validation(msg)),
                (Ok(()), ConditionMode::Add) => {
                    self.add_condition(&consultation, action).await.map(|c| {
                        report.added.push(c.clone());
                        c
                    })
                }
                (Ok(()), _) => self.update_condition(&resolver, action).await.map(|c| {
                    report.updated.push(c.clone());
                    c
                }),
            };
            match applied {
                Ok(condition) => resolver.remember(condition),
                Err(e) => {
                    tracing::warn!(
                        index,
                        mode = %action.mode,
                        condition = %action.condition_name,
                        error = %e,
                        "condition action failed"
                    );
                    report.errors.push(ActionError {
                        index,
                        mode: action.mode,
                        condition_name: action.condition_name.clone(),
                        condition_ref: action.condition_id.as_ref().map(ToString::to_string),
                        code: e.code().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        report.checked_at = self
            .consultations
            .advance_condition_check(consultation_id, window_end)
            .await?;

        tracing::info!(
            added = report.added.len(),
            updated = report.updated.len(),
            ignored = report.ignored,
            failed = report.errors.len(),
            "condition reconciliation completed"
        );
        Ok(ReconciliationOutcome::Completed(report))
    }

    async fn detect(
        &self,
        consultation: &Consultation,
        new_entries_context: &str,
        health_records_context: &str,
    ) -> Result<Vec<ConditionAction>, ConsultError> {
        let summary = if consultation.summary.trim().is_empty() {
            "No summary yet."
        } else {
            consultation.summary.as_str()
        };
        let records = if health_records_context.trim().is_empty() {
            "No related records."
        } else {
            health_records_context
        };
        let schema_json = strict_schema::<DetectedActions>().to_string();
        let request = CompletionRequest {
            model: String::new(),
            messages: vec![Message::user(detection_prompt(
                summary,
                new_entries_context,
                records,
                &schema_json,
            ))],
            system: None,
            max_tokens: 2048,
            temperature: Some(0.0),
            stop_sequences: None,
            output_config: Some(output_config_for::<DetectedActions>(SCHEMA_NAME)),
        };
        let response = self.provider.complete(&request).await?;
        decode_actions(&response.content)
    }

    async fn add_condition(
        &self,
        consultation: &Consultation,
        action: &ConditionAction,
    ) -> Result<Condition, ConsultError> {
        let condition_type = action.condition_type.ok_or_else(|| {
            ConsultError::Validation(format!("'{}' has no condition type", action.condition_name))
        })?;
        let name = action.condition_name.trim().to_string();
        let text = Condition::embedding_text(&action.notes, &name, condition_type);
        let embedding = self.embedder.embed_one(&text).await?;

        let now = Utc::now();
        let condition = Condition {
            id: Uuid::now_v7(),
            user_id: consultation.user_id,
            source_type: SourceType::Consultation,
            consultation_id: Some(consultation.id),
            condition_type,
            condition_name: name,
            icd_code: action.icd_code_estimate.clone(),
            diagnosis_date: Some(now.date_naive()),
            is_active: action.is_active,
            notes: action.notes.trim().to_string(),
            certainty: Some(action.certainty_level),
            embedding: Some(embedding),
            created_at: now,
            updated_at: now,
        };
        Ok(self.conditions.create_condition(&condition).await?)
    }

    async fn update_condition(
        &self,
        resolver: &ConditionResolver,
        action: &ConditionAction,
    ) -> Result<Condition, ConsultError> {
        let target = resolver.resolve(action)?;
        let id = target.id;
        let update = ConditionUpdate {
            is_active: action.is_active,
            notes: if action.notes.trim().is_empty() {
                target.notes.clone()
            } else {
                action.notes.trim().to_string()
            },
            icd_code: action.icd_code_estimate.clone(),
        };
        match self.conditions.update_condition(&id, &update).await {
            Ok(updated) => Ok(updated),
            Err(RepositoryError::NotFound) => Err(ConsultError::not_found("condition", id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CallKind, HashEmbedder, MemoryStore, ScriptedProvider};
    use medconsult_types::condition::ConditionType;
    use medconsult_types::llm::LlmError;

    struct Fixture {
        store: MemoryStore,
        scripted: ScriptedProvider,
        provider: BoxLlmProvider,
        embedder: BoxEmbedder,
        config: MemoryConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_embedder(HashEmbedder::new(8))
        }

        fn with_embedder(embedder: HashEmbedder) -> Self {
            let scripted = ScriptedProvider::new();
            Self {
                store: MemoryStore::new(),
                provider: BoxLlmProvider::new(scripted.clone()),
                scripted,
                embedder: BoxEmbedder::new(embedder),
                config: MemoryConfig::default(),
            }
        }

        fn reconciler(&self) -> ConditionReconciler<'_, MemoryStore, MemoryStore, MemoryStore> {
            ConditionReconciler::new(
                &self.store,
                &self.store,
                &self.store,
                &self.provider,
                &self.embedder,
                &self.config,
            )
        }

        fn due_consultation(&self) -> Consultation {
            let user = self.store.seed_user();
            let c = self.store.seed_consultation(user.id, "Cough review");
            self.store.seed_entries(c.id, c.last_condition_check_at, 5);
            c
        }
    }

    fn report(outcome: ReconciliationOutcome) -> ReconciliationReport {
        match outcome {
            ReconciliationOutcome::Completed(report) => report,
            other => panic!("expected completed reconciliation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_due_below_threshold() {
        let fx = Fixture::new();
        let user = fx.store.seed_user();
        let c = fx.store.seed_consultation(user.id, "x");
        fx.store.seed_entries(c.id, c.last_condition_check_at, 4);

        let outcome = fx.reconciler().reconcile(&c.id, "").await.unwrap();
        assert_eq!(outcome, ReconciliationOutcome::NotDue { pending: 4, threshold: 5 });
        assert_eq!(fx.scripted.calls(CallKind::Detection), 0);
    }

    #[tokio::test]
    async fn test_zero_actionable_detections_still_advance_marker() {
        let fx = Fixture::new();
        let c = fx.due_consultation();
        fx.scripted.push_ok(
            CallKind::Detection,
            r#"{"actions": [{"mode": "ignore", "condition_name": "cold", "notes": "", "certainty_level": 0.2}]}"#,
        );

        let r = report(fx.reconciler().reconcile(&c.id, "").await.unwrap());
        assert!(r.added.is_empty() && r.updated.is_empty() && r.errors.is_empty());
        assert_eq!(r.ignored, 1);

        let after = fx.store.consultation(c.id).last_condition_check_at;
        assert!(after > c.last_condition_check_at);
        assert_eq!(after, r.checked_at);

        let again = fx.reconciler().reconcile(&c.id, "").await.unwrap();
        assert_eq!(again, ReconciliationOutcome::NotDue { pending: 0, threshold: 5 });
    }

    #[tokio::test]
    async fn test_mixed_batch_add_bad_update_ignore() {
        let fx = Fixture::new();
        let c = fx.due_consultation();
        fx.store.seed_condition(c.user_id, "Hypertension", true, None);
        fx.scripted.push_ok(
            CallKind::Detection,
            r#"[
                {"mode": "add", "condition_name": "Lisinopril-induced cough", "condition_type": "adr",
                 "icd_code_estimate": "T46.4", "notes": "Dry cough after starting lisinopril.", "certainty_level": 0.8},
                {"mode": "update", "condition_name": "Asthma", "condition_id": 102,
                 "is_active": false, "notes": "Resolved.", "certainty_level": 0.6},
                {"mode": "ignore", "condition_name": "Common cold", "notes": "", "certainty_level": 0.1}
            ]"#,
        );

        let r = report(fx.reconciler().reconcile(&c.id, "").await.unwrap());
        assert_eq!(r.added.len(), 1);
        assert_eq!(r.errors.len(), 1);
        assert_eq!(r.ignored, 1);
        assert!(r.updated.is_empty());

        let added = &r.added[0];
        assert_eq!(added.condition_name, "Lisinopril-induced cough");
        assert_eq!(added.condition_type, ConditionType::Adr);
        assert_eq!(added.source_type, SourceType::Consultation);
        assert_eq!(added.consultation_id, Some(c.id));
        assert_eq!(added.icd_code.as_deref(), Some("T46.4"));
        assert_eq!(added.certainty, Some(0.8));
        assert!(added.diagnosis_date.is_some());
        assert_eq!(added.embedding.as_ref().unwrap().len(), 8);

        let err = &r.errors[0];
        assert_eq!(err.index, 1);
        assert_eq!(err.mode, ConditionMode::Update);
        assert_eq!(err.code, "RECORD_NOT_FOUND");
        assert_eq!(err.condition_ref.as_deref(), Some("102"));

        // Hypertension + the new ADR; nothing for the ignore.
        assert_eq!(fx.store.conditions_of(c.user_id).len(), 2);
        assert!(fx.store.consultation(c.id).last_condition_check_at > c.last_condition_check_at);
    }

    #[tokio::test]
    async fn test_update_resolves_placeholder_by_name() {
        let fx = Fixture::new();
        let c = fx.due_consultation();
        let existing = fx.store.seed_condition(c.user_id, "Seasonal allergies", true, None);
        fx.scripted.push_ok(
            CallKind::Detection,
            r#"{"actions": [{"mode": "update", "condition_name": "seasonal allergies", "condition_id": 101,
                "is_active": false, "icd_code_estimate": "J30.2", "notes": "Symptoms resolved after season.",
                "certainty_level": 0.4}]}"#,
        );

        let r = report(fx.reconciler().reconcile(&c.id, "").await.unwrap());
        assert_eq!(r.updated.len(), 1);
        let updated = &r.updated[0];
        assert_eq!(updated.id, existing.id);
        assert!(!updated.is_active);
        assert_eq!(updated.notes, "Symptoms resolved after season.");
        assert_eq!(updated.icd_code.as_deref(), Some("J30.2"));
    }

    #[tokio::test]
    async fn test_low_certainty_actions_are_still_applied() {
        let fx = Fixture::new();
        let c = fx.due_consultation();
        fx.scripted.push_ok(
            CallKind::Detection,
            r#"[{"mode": "add", "condition_name": "Insomnia", "condition_type": "symptom",
                 "notes": "Mentions poor sleep.", "certainty_level": 0.05}]"#,
        );
        let r = report(fx.reconciler().reconcile(&c.id, "").await.unwrap());
        assert_eq!(r.added.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_detection_call_keeps_marker() {
        let fx = Fixture::new();
        let c = fx.due_consultation();
        fx.scripted.push(CallKind::Detection, Err(LlmError::Timeout { seconds: 60 }));

        let err = fx.reconciler().reconcile(&c.id, "").await.unwrap_err();
        assert!(matches!(err, ConsultError::ProviderUnavailable(_)));
        assert_eq!(fx.store.consultation(c.id).last_condition_check_at, c.last_condition_check_at);
    }

    #[tokio::test]
    async fn test_invalid_action_does_not_abort_batch() {
        let fx = Fixture::new();
        let c = fx.due_consultation();
        fx.scripted.push_ok(
            CallKind::Detection,
            r#"[{"mode": "add", "condition_name": "Insomnia", "condition_type": "symptom",
                 "notes": "Wakes at 3am most nights.", "certainty_level": 0.7},
                {"mode": "add", "condition_name": "Fatigue", "condition_type": null,
                 "notes": "", "certainty_level": 0.7},
                {"mode": "update", "condition_name": "Insomnia", "notes": "", "certainty_level": 1.4}]"#,
        );

        let r = report(fx.reconciler().reconcile(&c.id, "").await.unwrap());
        assert_eq!(r.added.len(), 1);
        assert_eq!(r.added[0].condition_name, "Insomnia");
        assert_eq!(r.errors.len(), 2);
        assert_eq!((r.errors[0].index, r.errors[0].code.as_str()), (1, "VALIDATION_ERROR"));
        assert!(r.errors[0].message.contains("condition_type"));
        assert_eq!((r.errors[1].index, r.errors[1].code.as_str()), (2, "VALIDATION_ERROR"));

        assert_eq!(fx.store.conditions_of(c.user_id).len(), 1);
        assert!(fx.store.consultation(c.id).last_condition_check_at > c.last_condition_check_at);
    }

    #[tokio::test]
    async fn test_unparseable_detection_keeps_marker() {
        let fx = Fixture::new();
        let c = fx.due_consultation();
        fx.scripted.push_ok(
            CallKind::Detection,
            r#"[{"mode": "remove", "condition_name": "Fatigue", "notes": "", "certainty_level": 0.7}]"#,
        );

        let err = fx.reconciler().reconcile(&c.id, "").await.unwrap_err();
        assert!(matches!(err, ConsultError::ProviderMalformedOutput(_)));
        assert_eq!(fx.store.consultation(c.id).last_condition_check_at, c.last_condition_check_at);
        assert!(fx.store.conditions_of(c.user_id).is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_is_per_action() {
        let fx = Fixture::with_embedder(HashEmbedder::new(8).failing_on("Vertigo"));
        let c = fx.due_consultation();
        fx.scripted.push_ok(
            CallKind::Detection,
            r#"[{"mode": "add", "condition_name": "Vertigo", "condition_type": "symptom", "notes": "", "certainty_level": 0.7},
                {"mode": "add", "condition_name": "Nausea", "condition_type": "symptom", "notes": "", "certainty_level": 0.7}]"#,
        );

        let r = report(fx.reconciler().reconcile(&c.id, "").await.unwrap());
        assert_eq!(r.added.len(), 1);
        assert_eq!(r.added[0].condition_name, "Nausea");
        assert_eq!(r.errors[0].code, "PROVIDER_UNAVAILABLE");
    }

    #[test]
    fn test_decode_actions_accepts_wrapped_and_bare() {
        let wrapped = decode_actions(r#"{"actions": []}"#).unwrap();
        assert!(wrapped.is_empty());
        let bare = decode_actions(
            r#"[{"mode": "ignore", "condition_name": "", "notes": "", "certainty_level": 0.0}]"#,
        )
        .unwrap();
        assert_eq!(bare.len(), 1);
    }

    #[test]
    fn test_decode_actions_rejects_non_json() {
        assert!(matches!(
            decode_actions("No changes needed."),
            Err(ConsultError::ProviderMalformedOutput(_))
        ));
    }
}
