//! Periodic re-summarization of a consultation.
//!
//! A consultation's `updated_at` marks the end of the last summarized
//! window. Once at least `summary_update_threshold` entries exist strictly
//! after it, those entries are replayed chronologically into a cumulative
//! summary, which is embedded and written back. The write moves `updated_at`
//! to the newest summarized entry, closing the window exactly: entries that
//! arrive while the summary is being generated stay pending.

use uuid::Uuid;

use medconsult_types::config::MemoryConfig;
use medconsult_types::error::ConsultError;
use medconsult_types::llm::{CompletionRequest, Message};
use medconsult_types::memory::ConsolidationOutcome;

use crate::llm::box_provider::BoxLlmProvider;
use crate::memory::box_embedder::BoxEmbedder;
use crate::prompt::{format_summary_timeline, summarization_prompt};
use crate::repository::consultation::ConsultationRepository;
use crate::repository::timeline::TimelineRepository;

pub struct MemoryConsolidator<'a, C, T> {
    consultations: &'a C,
    timeline: &'a T,
    provider: &'a BoxLlmProvider,
    embedder: &'a BoxEmbedder,
    config: &'a MemoryConfig,
}

impl<'a, C, T> MemoryConsolidator<'a, C, T>
where
    C: ConsultationRepository,
    T: TimelineRepository,
{
    pub fn new(
        consultations: &'a C,
        timeline: &'a T,
        provider: &'a BoxLlmProvider,
        embedder: &'a BoxEmbedder,
        config: &'a MemoryConfig,
    ) -> Self {
        Self {
            consultations,
            timeline,
            provider,
            embedder,
            config,
        }
    }

    #[tracing::instrument(
        name = "consolidate_memory",
        skip(self),
        fields(consultation_id = %consultation_id)
    )]
    pub async fn consolidate(
        &self,
        consultation_id: &Uuid,
    ) -> Result<ConsolidationOutcome, ConsultError> {
        let consultation = self
            .consultations
            .get_consultation(consultation_id)
            .await?
            .ok_or_else(|| ConsultError::not_found("consultation", consultation_id))?;

        let threshold = self.config.summary_update_threshold;
        let pending = self
            .timeline
            .count_since(consultation_id, consultation.updated_at)
            .await? as usize;
        if pending < threshold {
            tracing::debug!(pending, threshold, "summary up to date");
            return Ok(ConsolidationOutcome::UpToDate { pending, threshold });
        }

        let entries = self
            .timeline
            .entries_since(consultation_id, consultation.updated_at)
            .await?;
        let Some(window_end) = entries.last().map(|e| e.created_at) else {
            return Ok(ConsolidationOutcome::UpToDate { pending: 0, threshold });
        };

        let prompt = summarization_prompt(&consultation.summary, &format_summary_timeline(&entries));
        let request = CompletionRequest {
            model: String::new(),
            messages: vec![Message::user(prompt)],
            system: None,
            max_tokens: 512,
            temperature: Some(0.0),
            stop_sequences: None,
            output_config: None,
        };
        let response = self.provider.complete(&request).await?;
        let summary = response.content.trim().to_string();
        if summary.is_empty() {
            return Err(ConsultError::ProviderMalformedOutput(
                "summarization returned empty text".to_string(),
            ));
        }

        let embedding = self.embedder.embed_one(&summary).await?;
        self.consultations
            .update_summary(consultation_id, &summary, &embedding, window_end)
            .await?;

        tracing::info!(entries_summarized = entries.len(), "consultation summary updated");
        Ok(ConsolidationOutcome::Updated {
            summary,
            entries_summarized: entries.len(),
        })
    }
}
