use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ForecastModel {
    /// Constant median-of-history fallback for short histories
    Baseline,
    /// Level plus day-of-week deviation with sqrt-horizon error bands
    WeeklySeasonal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetadata {
    pub model: ForecastModel,
    /// Backtested accuracy in percent, 0 to 100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Probabilistic daily demand forecast for one (store, SKU).
///
/// `median`, `p10` and `p90` always have one entry per forecast day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub id: Uuid,
    pub store_id: Uuid,
    pub sku_id: Uuid,
    pub horizon_hours: u32,
    pub generated_at: DateTime<Utc>,
    pub median: Vec<f64>,
    pub p10: Vec<f64>,
    pub p90: Vec<f64>,
    pub metadata: ForecastMetadata,
}

impl Forecast {
    pub fn days(&self) -> usize {
        self.median.len()
    }
}
