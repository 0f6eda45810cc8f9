use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One immutable sales line produced by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub id: Uuid,
    pub store_id: Uuid,
    pub sku_id: Uuid,
    pub sold_at: DateTime<Utc>,
    pub quantity: f64,
    pub price: Option<Decimal>,
    pub promo: Option<bool>,
}

/// A timestamped quantity, the unit the statistics kernel works on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub timestamp: DateTime<Utc>,
    pub quantity: f64,
}

impl DemandPoint {
    pub fn new(timestamp: DateTime<Utc>, quantity: f64) -> Self {
        Self {
            timestamp,
            quantity,
        }
    }

    /// Day of week with 0 = Sunday through 6 = Saturday.
    pub fn day_of_week(&self) -> usize {
        self.timestamp.weekday().num_days_from_sunday() as usize
    }
}

impl From<&SalesRecord> for DemandPoint {
    fn from(record: &SalesRecord) -> Self {
        DemandPoint::new(record.sold_at, record.quantity)
    }
}
