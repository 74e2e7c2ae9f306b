//! Results of one orchestrated consultation turn.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

use crate::error::ConsultError;
use crate::memory::{ConsolidationOutcome, ReconciliationOutcome, TurnInsight};
use crate::retrieval::ContextRecord;

/// The generated reply plus the two context blocks that fed the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTurn {
    pub response: String,
    pub timeline_context: String,
    pub health_records_context: String,
    pub records: Vec<ContextRecord>,
}

/// Post-response step that reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectStage {
    InsightExtraction,
    InsightEmbedding,
    TimelineAppend,
    Reconciliation,
    Consolidation,
}

impl fmt::Display for SideEffectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideEffectStage::InsightExtraction => write!(f, "insight_extraction"),
            SideEffectStage::InsightEmbedding => write!(f, "insight_embedding"),
            SideEffectStage::TimelineAppend => write!(f, "timeline_append"),
            SideEffectStage::Reconciliation => write!(f, "reconciliation"),
            SideEffectStage::Consolidation => write!(f, "consolidation"),
        }
    }
}

/// Structured error payload for a failed side effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideEffectError {
    pub stage: SideEffectStage,
    pub code: String,
    pub message: String,
}

impl SideEffectError {
    pub fn new(stage: SideEffectStage, err: &ConsultError) -> Self {
        Self {
            stage,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// What happened after the response was produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideEffects {
    /// Id of the appended timeline entry; `None` only if the append failed.
    pub entry_id: Option<Uuid>,
    pub insight: Option<TurnInsight>,
    pub reconciliation: Option<ReconciliationOutcome>,
    pub consolidation: Option<ConsolidationOutcome>,
    pub errors: Vec<SideEffectError>,
}

impl SideEffects {
    pub fn record_error(&mut self, stage: SideEffectStage, err: &ConsultError) {
        self.errors.push(SideEffectError::new(stage, err));
    }
}

/// Full result of a turn: the reply is always present once generation succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    #[serde(flatten)]
    pub turn: GeneratedTurn,
    pub side_effects: SideEffects,
}
