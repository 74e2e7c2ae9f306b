//! Memory types for MedConsult.
//!
//! These types model the structured outputs of the background memory
//! pipeline: per-turn insights, detected condition actions, and the
//! outcomes of consolidation and reconciliation runs.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::condition::{Condition, ConditionType};

/// Compressed, searchable insight extracted from a single turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TurnInsight {
    /// True only if the turn contains clinical facts, symptom or medication
    /// changes, or new recommendations. False for trivial turns.
    pub insight_found: bool,
    /// 1-3 line summary of the clinical facts and final recommendation.
    /// Only populated when `insight_found` is true.
    pub compressed_summary: String,
    /// The core condition, symptom, or medication addressed in the turn.
    pub primary_condition_or_symptom: String,
    /// 1-3 relevant ICD-10 codes mentioned or inferred.
    pub icd_codes_extracted: Vec<String>,
}

impl TurnInsight {
    /// Text to index for this turn, if any.
    pub fn indexable_text(&self) -> Option<&str> {
        let text = self.compressed_summary.trim();
        (self.insight_found && !text.is_empty()).then_some(text)
    }
}

/// What a detected condition action asks the store to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConditionMode {
    Add,
    Update,
    Ignore,
}

impl fmt::Display for ConditionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionMode::Add => write!(f, "add"),
            ConditionMode::Update => write!(f, "update"),
            ConditionMode::Ignore => write!(f, "ignore"),
        }
    }
}

impl FromStr for ConditionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add" => Ok(ConditionMode::Add),
            "update" => Ok(ConditionMode::Update),
            "ignore" => Ok(ConditionMode::Ignore),
            other => Err(format!("invalid condition mode: '{other}'")),
        }
    }
}

/// Placeholder reference to an existing condition, as produced by the model.
///
/// The model cannot know real primary keys, so this is either an invented
/// integer or a string that may (or may not) be a real id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ConditionRef {
    Number(i64),
    Text(String),
}

impl fmt::Display for ConditionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionRef::Number(n) => write!(f, "{n}"),
            ConditionRef::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A single add/update/ignore action proposed by condition detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionAction {
    /// 'add' for new findings, 'update' for status changes of a known
    /// condition, 'ignore' for trivial or already documented findings.
    pub mode: ConditionMode,
    /// Formal medical or symptom name. Required for 'add'.
    pub condition_name: String,
    /// Clinical classification. Required for 'add'.
    #[serde(default)]
    pub condition_type: Option<ConditionType>,
    /// Placeholder id of the existing condition. Required for 'update'.
    #[serde(default)]
    pub condition_id: Option<ConditionRef>,
    /// Estimated ICD-10 code.
    #[serde(default)]
    pub icd_code_estimate: Option<String>,
    /// True if ongoing or new, false if resolved.
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    /// Brief clinical note on the source of the finding.
    pub notes: String,
    /// Confidence in this action, 0.0 to 1.0.
    pub certainty_level: f64,
}

fn default_is_active() -> bool {
    true
}

impl ConditionAction {
    /// Structural checks beyond what the JSON decode enforces.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.certainty_level) {
            return Err(format!(
                "certainty_level {} is outside [0, 1]",
                self.certainty_level
            ));
        }
        match self.mode {
            ConditionMode::Add => {
                if self.condition_name.trim().is_empty() {
                    return Err("'add' action is missing condition_name".to_string());
                }
                if self.condition_type.is_none() {
                    return Err(format!(
                        "'add' action for '{}' is missing condition_type",
                        self.condition_name
                    ));
                }
                if self.condition_id.is_some() {
                    return Err(format!(
                        "'add' action for '{}' must not carry a condition_id",
                        self.condition_name
                    ));
                }
            }
            ConditionMode::Update => {
                if self.condition_id.is_none() {
                    return Err(format!(
                        "'update' action for '{}' is missing condition_id",
                        self.condition_name
                    ));
                }
            }
            ConditionMode::Ignore => {}
        }
        Ok(())
    }
}

/// Root object of the detection output schema.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectedActions {
    pub actions: Vec<ConditionAction>,
}

/// Result of a consolidation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConsolidationOutcome {
    /// Fewer than the threshold entries were pending; nothing changed.
    UpToDate { pending: usize, threshold: usize },
    /// The summary was rewritten.
    Updated {
        summary: String,
        entries_summarized: usize,
    },
}

/// A single reconciliation action that could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionError {
    pub index: usize,
    pub mode: ConditionMode,
    pub condition_name: String,
    pub condition_ref: Option<String>,
    pub code: String,
    pub message: String,
}

/// Result of a completed reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub added: Vec<Condition>,
    pub updated: Vec<Condition>,
    pub ignored: usize,
    pub errors: Vec<ActionError>,
    pub checked_at: DateTime<Utc>,
}

/// Result of a reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    NotDue { pending: usize, threshold: usize },
    Completed(ReconciliationReport),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(json: &str) -> ConditionAction {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_condition_ref_accepts_number_or_string() {
        let a = action(
            r#"{"mode":"update","condition_name":"Hypertension","condition_id":101,"notes":"","certainty_level":0.8}"#,
        );
        assert_eq!(a.condition_id, Some(ConditionRef::Number(101)));
        let b = action(
            r#"{"mode":"update","condition_name":"Hypertension","condition_id":"abc","notes":"","certainty_level":0.8}"#,
        );
        assert_eq!(b.condition_id, Some(ConditionRef::Text("abc".to_string())));
    }

    #[test]
    fn test_is_active_defaults_to_true() {
        let a = action(
            r#"{"mode":"add","condition_name":"Cough","condition_type":"symptom","notes":"dry","certainty_level":0.9}"#,
        );
        assert!(a.is_active);
        assert!(a.validate().is_ok());
    }

    #[test]
    fn test_missing_certainty_fails_decode() {
        let result: Result<ConditionAction, _> =
            serde_json::from_str(r#"{"mode":"add","condition_name":"Cough","notes":""}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_add_without_type() {
        let a = action(r#"{"mode":"add","condition_name":"Cough","notes":"","certainty_level":0.5}"#);
        assert!(a.validate().unwrap_err().contains("condition_type"));
    }

    #[test]
    fn test_validate_rejects_update_without_id() {
        let a = action(r#"{"mode":"update","condition_name":"Cough","notes":"","certainty_level":0.5}"#);
        assert!(a.validate().unwrap_err().contains("condition_id"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_certainty() {
        let a = action(r#"{"mode":"ignore","condition_name":"","notes":"","certainty_level":1.5}"#);
        assert!(a.validate().is_err());
    }

    #[test]
    fn test_trivial_insight_is_not_indexable() {
        let insight = TurnInsight {
            insight_found: false,
            compressed_summary: "Patient said thanks".to_string(),
            primary_condition_or_symptom: String::new(),
            icd_codes_extracted: vec![],
        };
        assert!(insight.indexable_text().is_none());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = ConsolidationOutcome::UpToDate {
            pending: 3,
            threshold: 10,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "up_to_date");
        assert_eq!(json["pending"], 3);
    }
}
