//! Query parameter extractors for list endpoints.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use medconsult_types::vitals::VitalsQuery;

/// Query parameters for a user's consultation list.
#[derive(Debug, Deserialize, Default)]
pub struct ConsultationListQuery {
    /// Maximum results (defaults to 5).
    pub limit: Option<u32>,
}

/// Query parameters for a user's condition list.
#[derive(Debug, Deserialize, Default)]
pub struct ConditionListQuery {
    /// Only return active conditions.
    #[serde(default)]
    pub active: bool,
}

/// Query parameters for the vitals time series. Bounds are RFC 3339.
#[derive(Debug, Deserialize, Default)]
pub struct VitalsListQuery {
    pub metric: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl From<VitalsListQuery> for VitalsQuery {
    fn from(q: VitalsListQuery) -> Self {
        VitalsQuery {
            metric: q.metric.filter(|m| !m.trim().is_empty()),
            from: q.from,
            to: q.to,
        }
    }
}
