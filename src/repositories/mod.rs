use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{
    Anomaly, AnomalyStatus, Forecast, InventorySnapshot, ReorderStatus, ReorderSuggestion,
    SalesRecord, Sku, Store,
};

pub mod memory;
pub mod sea_orm_store;

pub use memory::InMemoryStore;
pub use sea_orm_store::SeaOrmStore;

/// Read/write access to the records the forecasting core consumes and produces.
///
/// Implementations own any upsert and conflict semantics. A stored forecast is
/// always replaced wholesale per (store, SKU).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForecastStore: Send + Sync {
    async fn find_store(&self, store_id: Uuid) -> Result<Option<Store>, ServiceError>;

    /// Active SKUs of an organization, ordered by code.
    async fn list_active_skus(&self, organization_id: Uuid) -> Result<Vec<Sku>, ServiceError>;

    async fn find_sku(&self, sku_id: Uuid) -> Result<Option<Sku>, ServiceError>;

    /// Sales of a store with `from <= sold_at <= to`, ascending by `sold_at`.
    async fn list_sales(
        &self,
        store_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SalesRecord>, ServiceError>;

    /// Current inventory rows of a store, ordered by SKU id.
    async fn list_inventory(&self, store_id: Uuid) -> Result<Vec<InventorySnapshot>, ServiceError>;

    async fn find_forecast(
        &self,
        store_id: Uuid,
        sku_id: Uuid,
    ) -> Result<Option<Forecast>, ServiceError>;

    async fn upsert_forecast(&self, forecast: Forecast) -> Result<(), ServiceError>;

    async fn insert_reorder_suggestion(
        &self,
        suggestion: ReorderSuggestion,
    ) -> Result<(), ServiceError>;

    async fn find_reorder_suggestion(
        &self,
        id: Uuid,
    ) -> Result<Option<ReorderSuggestion>, ServiceError>;

    /// A pending suggestion for the SKU in the store, if one is still awaiting review.
    async fn find_pending_reorder_suggestion(
        &self,
        store_id: Uuid,
        sku_id: Uuid,
    ) -> Result<Option<ReorderSuggestion>, ServiceError>;

    /// Moves a pending suggestion to `status`. The pending check and the write are one
    /// step: a suggestion that is no longer pending fails with `InvalidOperation`.
    async fn update_reorder_status(&self, id: Uuid, status: ReorderStatus)
        -> Result<(), ServiceError>;

    /// Upserts by id. An existing record keeps its status and resolution time.
    async fn insert_anomalies(&self, anomalies: Vec<Anomaly>) -> Result<(), ServiceError>;

    async fn find_anomaly(&self, id: Uuid) -> Result<Option<Anomaly>, ServiceError>;

    /// Resolves a pending anomaly, with the same guard as [`Self::update_reorder_status`].
    async fn update_anomaly_status(
        &self,
        id: Uuid,
        status: AnomalyStatus,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<(), ServiceError>;
}
