use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReorderStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReorderAction {
    Approve,
    Reject,
}

impl ReorderAction {
    pub fn target_status(self) -> ReorderStatus {
        match self {
            ReorderAction::Approve => ReorderStatus::Approved,
            ReorderAction::Reject => ReorderStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReorderAlternatives {
    /// Quantity under the aggressive (1.5x lead time demand) model. May be <= 0.
    pub aggressive: i64,
}

/// Audit trail of how a suggestion was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReorderRationale {
    Conservative {
        lead_time_demand: f64,
        available_stock: i64,
        reorder_point: f64,
        alternatives: ReorderAlternatives,
    },
}

impl ReorderRationale {
    pub fn aggressive_qty(&self) -> i64 {
        match self {
            ReorderRationale::Conservative { alternatives, .. } => alternatives.aggressive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    pub id: Uuid,
    pub store_id: Uuid,
    pub sku_id: Uuid,
    pub suggested_qty: i64,
    pub safety_stock: i64,
    pub lead_time_days: u32,
    pub rationale: ReorderRationale,
    pub status: ReorderStatus,
}
