use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current stock state for one (store, SKU).
///
/// `on_hand` may be negative; that is a data quality signal, not a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub store_id: Uuid,
    pub sku_id: Uuid,
    pub on_hand: i64,
    pub reserved: i64,
    pub last_counted_at: Option<DateTime<Utc>>,
}

impl InventorySnapshot {
    /// Stock that can still be sold. Not clamped.
    pub fn available(&self) -> i64 {
        self.on_hand - self.reserved
    }
}
