use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Calendar event body sent to the provider's insert endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Deterministic id derived from the task id.
    pub id: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
}

/// Local wall-clock time plus the IANA zone it is expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: NaiveDateTime,
    pub time_zone: String,
}
