//! Per-turn insight extraction via LLM.
//!
//! `InsightExtractor` asks the generation provider for a schema-constrained
//! `TurnInsight` describing a single query/response pair. The compressed
//! summary becomes the turn's searchable text; trivial turns report
//! `insight_found = false` and are not indexed.

use medconsult_types::error::ConsultError;
use medconsult_types::llm::{CompletionRequest, Message};
use medconsult_types::memory::TurnInsight;

use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::structured::{decode, output_config_for, strict_schema};
use crate::prompt::insight_prompt;

const SCHEMA_NAME: &str = "TurnInsight";

/// Stateless utility for extracting a compressed insight from one turn.
pub struct InsightExtractor;

impl InsightExtractor {
    #[tracing::instrument(
        name = "extract_insight",
        skip(provider, user_query, model_response),
        fields(query_len = user_query.len(), response_len = model_response.len())
    )]
    pub async fn extract(
        provider: &BoxLlmProvider,
        user_query: &str,
        model_response: &str,
    ) -> Result<TurnInsight, ConsultError> {
        let schema_json = strict_schema::<TurnInsight>().to_string();
        let request = CompletionRequest {
            model: String::new(),
            messages: vec![Message::user(insight_prompt(
                user_query,
                model_response,
                &schema_json,
            ))],
            system: None,
            max_tokens: 512,
            temperature: Some(0.0),
            stop_sequences: None,
            output_config: Some(output_config_for::<TurnInsight>(SCHEMA_NAME)),
        };

        let response = provider.complete(&request).await?;
        let insight: TurnInsight = decode(&response.content, "turn insight")?;
        tracing::debug!(insight_found = insight.insight_found, "insight extracted");
        Ok(insight)
    }
}
