use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnomalyType {
    DemandSpike,
    DemandDrop,
    PatternChange,
    NegativeStock,
    StaleInventory,
    ExcessiveReserved,
}

/// Ordered so that `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnomalyStatus {
    Pending,
    Accepted,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnomalyAction {
    Accept,
    Ignore,
}

impl AnomalyAction {
    pub fn target_status(self) -> AnomalyStatus {
        match self {
            AnomalyAction::Accept => AnomalyStatus::Accepted,
            AnomalyAction::Ignore => AnomalyStatus::Ignored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: Uuid,
    pub store_id: Uuid,
    pub sku_id: Uuid,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub description: String,
    pub status: AnomalyStatus,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub total: usize,
    pub high_severity: usize,
    pub medium_severity: usize,
    pub low_severity: usize,
}

impl AnomalySummary {
    pub fn from_anomalies(anomalies: &[Anomaly]) -> Self {
        anomalies.iter().fold(Self::default(), |mut summary, a| {
            summary.total += 1;
            match a.severity {
                Severity::High => summary.high_severity += 1,
                Severity::Medium => summary.medium_severity += 1,
                Severity::Low => summary.low_severity += 1,
            }
            summary
        })
    }
}

/// Result of one store's detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub anomalies: Vec<Anomaly>,
    pub summary: AnomalySummary,
}

impl AnomalyReport {
    pub fn new(anomalies: Vec<Anomaly>) -> Self {
        let summary = AnomalySummary::from_anomalies(&anomalies);
        Self { anomalies, summary }
    }
}
