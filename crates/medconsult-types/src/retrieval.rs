//! Retrieval results surfaced to the consultation prompt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// Which store a context record was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Condition,
    Consultation,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Condition => write!(f, "Condition"),
            RecordKind::Consultation => write!(f, "Consultation Summary"),
        }
    }
}

/// One retrieved chunk of historical context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub kind: RecordKind,
    pub id: Uuid,
    pub title: String,
    pub snippet: String,
    pub date: DateTime<Utc>,
    /// `1 - cosine_distance`.
    pub similarity: f32,
}
