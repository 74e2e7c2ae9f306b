//! Consultation orchestrator.
//!
//! One turn runs as a sequential chain: embed the query, retrieve
//! historical context, load the recent session window, generate the reply.
//! Any failure up to and including generation aborts the turn. After the
//! reply exists the post-response side effects run in order (insight,
//! insight embedding, timeline append, reconciliation, consolidation); each
//! failure there is logged and reported in [`SideEffects`] without touching
//! the reply.

use std::sync::Arc;

use uuid::Uuid;

use medconsult_types::config::MedConsultConfig;
use medconsult_types::consultation::{Consultation, TimelineEntry};
use medconsult_types::error::ConsultError;
use medconsult_types::llm::{CompletionRequest, Message};
use medconsult_types::memory::{ConsolidationOutcome, ReconciliationOutcome};
use medconsult_types::turn::{GeneratedTurn, SideEffectStage, SideEffects, TurnOutcome};

use crate::llm::box_provider::BoxLlmProvider;
use crate::memory::box_embedder::BoxEmbedder;
use crate::memory::consolidation::MemoryConsolidator;
use crate::memory::insight::InsightExtractor;
use crate::memory::reconciliation::ConditionReconciler;
use crate::prompt::{
    NO_SESSION_HISTORY, consultation_prompt, format_health_records, format_session_metadata,
    format_timeline, no_records_found,
};
use crate::repository::condition::ConditionRepository;
use crate::repository::consultation::ConsultationRepository;
use crate::repository::timeline::TimelineRepository;
use crate::retrieval::RetrievalEngine;

/// Drives consultation turns and the manual memory triggers.
///
/// Providers are injected at construction so tests and alternative
/// deployments can substitute their own.
pub struct ConsultationService<C, T, K> {
    consultations: C,
    timeline: T,
    conditions: K,
    provider: Arc<BoxLlmProvider>,
    embedder: Arc<BoxEmbedder>,
    config: MedConsultConfig,
}

impl<C, T, K> ConsultationService<C, T, K>
where
    C: ConsultationRepository,
    T: TimelineRepository,
    K: ConditionRepository,
{
    pub fn new(
        consultations: C,
        timeline: T,
        conditions: K,
        provider: Arc<BoxLlmProvider>,
        embedder: Arc<BoxEmbedder>,
        config: MedConsultConfig,
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

    pub fn config(&self) -> &MedConsultConfig {
        &self.config
    }

    /// Run a full turn: generate the reply, then every side effect.
    ///
    /// `user_id`, when given, must own the consultation.
    #[tracing::instrument(
        name = "consultation_turn",
        skip(self, query),
        fields(consultation_id = %consultation_id, query_len = query.len())
    )]
    pub async fn handle_turn(
        &self,
        user_id: Option<Uuid>,
        consultation_id: &Uuid,
        query: &str,
    ) -> Result<TurnOutcome, ConsultError> {
        let turn = self.respond(user_id, consultation_id, query).await?;
        let side_effects = self.record_turn(consultation_id, query.trim(), &turn).await;
        Ok(TurnOutcome { turn, side_effects })
    }

    /// Generate a reply without any persistence.
    pub async fn respond(
        &self,
        user_id: Option<Uuid>,
        consultation_id: &Uuid,
        query: &str,
    ) -> Result<GeneratedTurn, ConsultError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ConsultError::Validation("query must not be empty".to_string()));
        }

        let consultation = self.load(consultation_id).await?;
        if user_id.is_some_and(|u| u != consultation.user_id) {
            return Err(ConsultError::not_found("consultation", consultation_id));
        }

        let query_embedding = self.embedder.embed_one(query).await?;
        let records = self
            .retrieval()
            .retrieve(&consultation.user_id, Some(consultation.id), &query_embedding)
            .await?;

        let recent_turns = self.config.memory.recent_turns;
        let mut recent = self
            .timeline
            .recent_entries(consultation_id, recent_turns)
            .await?;
        recent.reverse();

        let timeline_context = if recent.is_empty() {
            NO_SESSION_HISTORY.to_string()
        } else {
            format_timeline(&recent)
        };
        let health_records_context = self.records_context(&records);

        let prompt = consultation_prompt(
            &format_session_metadata(&consultation),
            &timeline_context,
            &health_records_context,
            self.config.retrieval.similarity_threshold,
            self.config.retrieval.max_context_chunks,
            recent_turns,
            query,
        );
        let request = CompletionRequest {
            model: String::new(),
            messages: vec![Message::user(prompt)],
            system: None,
            max_tokens: self.config.generation.max_tokens,
            temperature: Some(self.config.generation.temperature),
            stop_sequences: None,
            output_config: None,
        };
        let response = self.provider.complete(&request).await?;
        let reply = response.content.trim();
        if reply.is_empty() {
            return Err(ConsultError::ProviderMalformedOutput(
                "generation returned an empty reply".to_string(),
            ));
        }

        tracing::info!(
            records = records.len(),
            history = recent.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "consultation reply generated"
        );
        Ok(GeneratedTurn {
            response: reply.to_string(),
            timeline_context,
            health_records_context,
            records,
        })
    }

    /// Manually trigger summary consolidation.
    pub async fn consolidate(
        &self,
        consultation_id: &Uuid,
    ) -> Result<ConsolidationOutcome, ConsultError> {
        self.consolidator().consolidate(consultation_id).await
    }

    /// Manually trigger condition reconciliation.
    ///
    /// Historical context is recomputed from the consultation summary, or
    /// the heading while no summary exists yet.
    pub async fn reconcile(
        &self,
        consultation_id: &Uuid,
    ) -> Result<ReconciliationOutcome, ConsultError> {
        let consultation = self.load(consultation_id).await?;
        let basis = if consultation.summary.trim().is_empty() {
            consultation.heading.as_str()
        } else {
            consultation.summary.as_str()
        };
        let embedding = self.embedder.embed_one(basis).await?;
        let records = self
            .retrieval()
            .retrieve(&consultation.user_id, Some(consultation.id), &embedding)
            .await?;
        self.reconciler()
            .reconcile(consultation_id, &self.records_context(&records))
            .await
    }

    async fn record_turn(
        &self,
        consultation_id: &Uuid,
        query: &str,
        turn: &GeneratedTurn,
    ) -> SideEffects {
        let mut effects = SideEffects::default();

        let insight = match InsightExtractor::extract(&self.provider, query, &turn.response).await {
            Ok(insight) => Some(insight),
            Err(e) => {
                side_effect_failed(&mut effects, SideEffectStage::InsightExtraction, e);
                None
            }
        };

        let mut entry = TimelineEntry::new(*consultation_id, query, turn.response.as_str());
        if let Some(text) = insight.as_ref().and_then(|i| i.indexable_text()) {
            match self.embedder.embed_one(text).await {
                Ok(vector) => entry = entry.with_insight(text.to_string(), vector),
                Err(e) => {
                    entry.insights = Some(text.to_string());
                    side_effect_failed(&mut effects, SideEffectStage::InsightEmbedding, e.into());
                }
            }
        }
        effects.insight = insight;

        match self.timeline.append_entry(&entry).await {
            Ok(saved) => effects.entry_id = Some(saved.id),
            Err(e) => side_effect_failed(&mut effects, SideEffectStage::TimelineAppend, e.into()),
        }

        match self
            .reconciler()
            .reconcile(consultation_id, &turn.health_records_context)
            .await
        {
            Ok(outcome) => effects.reconciliation = Some(outcome),
            Err(e) => side_effect_failed(&mut effects, SideEffectStage::Reconciliation, e),
        }

        match self.consolidator().consolidate(consultation_id).await {
            Ok(outcome) => effects.consolidation = Some(outcome),
            Err(e) => side_effect_failed(&mut effects, SideEffectStage::Consolidation, e),
        }

        effects
    }

    async fn load(&self, consultation_id: &Uuid) -> Result<Consultation, ConsultError> {
        self.consultations
            .get_consultation(consultation_id)
            .await?
            .ok_or_else(|| ConsultError::not_found("consultation", consultation_id))
    }

    fn records_context(&self, records: &[medconsult_types::retrieval::ContextRecord]) -> String {
        if records.is_empty() {
            no_records_found(self.config.retrieval.similarity_threshold)
        } else {
            format_health_records(records)
        }
    }

    fn retrieval(&self) -> RetrievalEngine<'_, C, K> {
        RetrievalEngine::new(&self.consultations, &self.conditions, &self.config.retrieval)
    }

    fn reconciler(&self) -> ConditionReconciler<'_, C, T, K> {
        ConditionReconciler::new(
            &self.consultations,
            &self.timeline,
            &self.conditions,
            &self.provider,
            &self.embedder,
            &self.config.memory,
        )
    }

    fn consolidator(&self) -> MemoryConsolidator<'_, C, T> {
        MemoryConsolidator::new(
            &self.consultations,
            &self.timeline,
            &self.provider,
            &self.embedder,
            &self.config.memory,
        )
    }
}

fn side_effect_failed(effects: &mut SideEffects, stage: SideEffectStage, err: ConsultError) {
    tracing::warn!(stage = %stage, code = err.code(), error = %err, "turn side effect failed");
    effects.record_error(stage, &err);
}
