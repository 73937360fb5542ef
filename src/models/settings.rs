use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoringSettings {
    /// IANA zone used to place task timestamps on the calendar.
    pub timezone: String,
    /// Evaluation timestamps inside the same bucket share a cached report.
    pub status_granularity_minutes: u32,
    pub updated_at: String,
}
