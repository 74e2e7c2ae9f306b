//! Clinical conditions extracted from consultations or reported externally.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Clinical classification of a condition record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    /// Chronic or acute condition.
    Condition,
    /// Transient symptom.
    Symptom,
    /// Adverse drug reaction.
    Adr,
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionType::Condition => write!(f, "condition"),
            ConditionType::Symptom => write!(f, "symptom"),
            ConditionType::Adr => write!(f, "adr"),
        }
    }
}

impl FromStr for ConditionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "condition" => Ok(ConditionType::Condition),
            "symptom" => Ok(ConditionType::Symptom),
            "adr" => Ok(ConditionType::Adr),
            other => Err(format!("invalid condition type: '{other}'")),
        }
    }
}

/// Where a condition record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Consultation,
    UserReport,
    LabResult,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Consultation => write!(f, "consultation"),
            SourceType::UserReport => write!(f, "user_report"),
            SourceType::LabResult => write!(f, "lab_result"),
        }
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "consultation" => Ok(SourceType::Consultation),
            "user_report" => Ok(SourceType::UserReport),
            "lab_result" => Ok(SourceType::LabResult),
            other => Err(format!("invalid source type: '{other}'")),
        }
    }
}

/// A user's condition, symptom, or adverse drug reaction.
///
/// Invariant: `source_type == Consultation` implies `consultation_id.is_some()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source_type: SourceType,
    pub consultation_id: Option<Uuid>,
    pub condition_type: ConditionType,
    pub condition_name: String,
    pub icd_code: Option<String>,
    pub diagnosis_date: Option<NaiveDate>,
    pub is_active: bool,
    pub notes: String,
    pub certainty: Option<f64>,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Condition {
    /// Text used to embed a condition for similarity search.
    pub fn embedding_text(notes: &str, name: &str, condition_type: ConditionType) -> String {
        format!("{notes} {name} {condition_type}").trim().to_string()
    }

    /// Check the source/consultation invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.source_type == SourceType::Consultation && self.consultation_id.is_none() {
            return Err("condition sourced from a consultation must reference it".to_string());
        }
        if self.condition_name.trim().is_empty() {
            return Err("condition name must not be empty".to_string());
        }
        Ok(())
    }
}

/// Fields a reconciliation `update` may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionUpdate {
    pub is_active: bool,
    pub notes: String,
    pub icd_code: Option<String>,
}
