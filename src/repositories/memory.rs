use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::ForecastStore;
use crate::errors::ServiceError;
use crate::models::{
    Anomaly, AnomalyStatus, Forecast, InventorySnapshot, ReorderStatus, ReorderSuggestion,
    SalesRecord, Sku, Store,
};

/// Process-local store backed by concurrent maps. Used by tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    stores: DashMap<Uuid, Store>,
    skus: DashMap<Uuid, Sku>,
    sales: DashMap<Uuid, Vec<SalesRecord>>,
    inventory: DashMap<(Uuid, Uuid), InventorySnapshot>,
    forecasts: DashMap<(Uuid, Uuid), Forecast>,
    suggestions: DashMap<Uuid, ReorderSuggestion>,
    anomalies: DashMap<Uuid, Anomaly>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_store(&self, store: Store) {
        self.stores.insert(store.id, store);
    }

    pub fn add_sku(&self, sku: Sku) {
        self.skus.insert(sku.id, sku);
    }

    pub fn add_sales(&self, records: impl IntoIterator<Item = SalesRecord>) {
        for record in records {
            self.sales.entry(record.store_id).or_default().push(record);
        }
    }

    pub fn upsert_inventory(&self, snapshot: InventorySnapshot) {
        self.inventory
            .insert((snapshot.store_id, snapshot.sku_id), snapshot);
    }

    pub fn forecasts_for_store(&self, store_id: Uuid) -> Vec<Forecast> {
        let mut forecasts: Vec<Forecast> = self
            .forecasts
            .iter()
            .filter(|entry| entry.key().0 == store_id)
            .map(|entry| entry.value().clone())
            .collect();
        forecasts.sort_by_key(|f| f.sku_id);
        forecasts
    }

    pub fn suggestions_for_store(&self, store_id: Uuid) -> Vec<ReorderSuggestion> {
        let mut suggestions: Vec<ReorderSuggestion> = self
            .suggestions
            .iter()
            .filter(|entry| entry.value().store_id == store_id)
            .map(|entry| entry.value().clone())
            .collect();
        suggestions.sort_by_key(|s| s.sku_id);
        suggestions
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }
}

#[async_trait]
impl ForecastStore for InMemoryStore {
    async fn find_store(&self, store_id: Uuid) -> Result<Option<Store>, ServiceError> {
        Ok(self.stores.get(&store_id).map(|s| s.value().clone()))
    }

    async fn list_active_skus(&self, organization_id: Uuid) -> Result<Vec<Sku>, ServiceError> {
        let mut skus: Vec<Sku> = self
            .skus
            .iter()
            .filter(|entry| entry.organization_id == organization_id && entry.active)
            .map(|entry| entry.value().clone())
            .collect();
        skus.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(skus)
    }

    async fn find_sku(&self, sku_id: Uuid) -> Result<Option<Sku>, ServiceError> {
        Ok(self.skus.get(&sku_id).map(|s| s.value().clone()))
    }

    async fn list_sales(
        &self,
        store_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SalesRecord>, ServiceError> {
        let mut records: Vec<SalesRecord> = self
            .sales
            .get(&store_id)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|r| r.sold_at >= from && r.sold_at <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        records.sort_by_key(|r| r.sold_at);
        Ok(records)
    }

    async fn list_inventory(&self, store_id: Uuid) -> Result<Vec<InventorySnapshot>, ServiceError> {
        let mut rows: Vec<InventorySnapshot> = self
            .inventory
            .iter()
            .filter(|entry| entry.key().0 == store_id)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|r| r.sku_id);
        Ok(rows)
    }

    async fn find_forecast(
        &self,
        store_id: Uuid,
        sku_id: Uuid,
    ) -> Result<Option<Forecast>, ServiceError> {
        Ok(self
            .forecasts
            .get(&(store_id, sku_id))
            .map(|f| f.value().clone()))
    }

    async fn upsert_forecast(&self, forecast: Forecast) -> Result<(), ServiceError> {
        self.forecasts
            .insert((forecast.store_id, forecast.sku_id), forecast);
        Ok(())
    }

    async fn insert_reorder_suggestion(
        &self,
        suggestion: ReorderSuggestion,
    ) -> Result<(), ServiceError> {
        self.suggestions.insert(suggestion.id, suggestion);
        Ok(())
    }

    async fn find_reorder_suggestion(
        &self,
        id: Uuid,
    ) -> Result<Option<ReorderSuggestion>, ServiceError> {
        Ok(self.suggestions.get(&id).map(|s| s.value().clone()))
    }

    async fn find_pending_reorder_suggestion(
        &self,
        store_id: Uuid,
        sku_id: Uuid,
    ) -> Result<Option<ReorderSuggestion>, ServiceError> {
        Ok(self
            .suggestions
            .iter()
            .find(|entry| {
                let s = entry.value();
                s.store_id == store_id && s.sku_id == sku_id && s.status == ReorderStatus::Pending
            })
            .map(|entry| entry.value().clone()))
    }

    async fn update_reorder_status(
        &self,
        id: Uuid,
        status: ReorderStatus,
    ) -> Result<(), ServiceError> {
        let mut suggestion = self
            .suggestions
            .get_mut(&id)
            .ok_or_else(|| ServiceError::suggestion_not_found(id))?;
        if suggestion.status != ReorderStatus::Pending {
            return Err(ServiceError::not_pending(
                "Reorder suggestion",
                id,
                suggestion.status,
            ));
        }
        suggestion.status = status;
        Ok(())
    }

    async fn insert_anomalies(&self, anomalies: Vec<Anomaly>) -> Result<(), ServiceError> {
        for anomaly in anomalies {
            self.anomalies
                .entry(anomaly.id)
                .and_modify(|existing| {
                    existing.severity = anomaly.severity;
                    existing.description = anomaly.description.clone();
                    existing.detected_at = anomaly.detected_at;
                })
                .or_insert(anomaly);
        }
        Ok(())
    }

    async fn find_anomaly(&self, id: Uuid) -> Result<Option<Anomaly>, ServiceError> {
        Ok(self.anomalies.get(&id).map(|a| a.value().clone()))
    }

    async fn update_anomaly_status(
        &self,
        id: Uuid,
        status: AnomalyStatus,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<(), ServiceError> {
        let mut anomaly = self
            .anomalies
            .get_mut(&id)
            .ok_or_else(|| ServiceError::anomaly_not_found(id))?;
        if anomaly.status != AnomalyStatus::Pending {
            return Err(ServiceError::not_pending("Anomaly", id, anomaly.status));
        }
        anomaly.status = status;
        anomaly.resolved_at = resolved_at;
        Ok(())
    }
}
