//! Vitals time series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single timestamped measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub metric_name: String,
    pub metric_value: f64,
    pub consultation_id: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordVitalRequest {
    pub metric_name: String,
    pub metric_value: f64,
    #[serde(default)]
    pub consultation_id: Option<Uuid>,
    /// Defaults to now.
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Filter for querying a user's vitals. Bounds are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitalsQuery {
    pub metric: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
