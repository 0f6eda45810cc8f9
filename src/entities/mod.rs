//! sea-orm entities backing [`crate::repositories::SeaOrmStore`].

pub mod anomaly;
pub mod forecast;
pub mod inventory_snapshot;
pub mod reorder_suggestion;
pub mod sales_record;
pub mod sku;
pub mod store;
