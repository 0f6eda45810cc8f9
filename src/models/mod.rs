//! Domain records consumed and produced by the forecasting core.
//!
//! These are plain data types. Persistence mapping lives in `crate::entities`.

pub mod anomaly;
pub mod catalog;
pub mod forecast;
pub mod inventory;
pub mod reorder;
pub mod sales;

pub use anomaly::{
    Anomaly, AnomalyAction, AnomalyReport, AnomalyStatus, AnomalySummary, AnomalyType, Severity,
};
pub use catalog::{Sku, Store};
pub use forecast::{Forecast, ForecastMetadata, ForecastModel};
pub use inventory::InventorySnapshot;
pub use reorder::{
    ReorderAction, ReorderAlternatives, ReorderRationale, ReorderStatus, ReorderSuggestion,
};
pub use sales::{DemandPoint, SalesRecord};
