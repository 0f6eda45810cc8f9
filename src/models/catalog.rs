use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A store belongs to one organization; SKUs are mastered per organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
}

/// SKU master data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub code: String,
    /// Days between placing a reorder and stock arriving
    pub lead_time_days: u32,
    pub price: Option<Decimal>,
    pub active: bool,
}
