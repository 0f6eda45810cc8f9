use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::{ForecastSettings, ReorderSettings};
use crate::errors::ServiceError;
use crate::ml::statistics::daily_aggregate;
use crate::ml::{generate_forecast, suggest_reorder};
use crate::models::{
    DemandPoint, InventorySnapshot, ReorderAction, ReorderStatus, ReorderSuggestion, Sku, Store,
};
use crate::repositories::ForecastStore;

/// A SKU that failed during a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkuFailure {
    pub sku_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastRunReport {
    pub store_id: Uuid,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<SkuFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReorderRunReport {
    pub store_id: Uuid,
    /// Inventory rows looked at
    pub evaluated: usize,
    pub created: usize,
    /// Available stock above the reorder point
    pub not_triggered: usize,
    /// Triggered with a non-positive quantity and not persisted
    pub suppressed: usize,
    /// No forecast, no SKU master data, or a suggestion still pending review
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<SkuFailure>,
}

enum ReorderOutcome {
    Created,
    NotTriggered,
    Suppressed,
    Skipped,
}

/// Batch entry points for forecasting and reorder suggestions of one store.
///
/// Every SKU is processed on its own: a failing SKU is logged and counted, and the
/// run continues with the next one. Nothing is persisted for a SKU that failed.
#[derive(Clone)]
pub struct ForecastingService {
    store: Arc<dyn ForecastStore>,
    forecast: ForecastSettings,
    reorder: ReorderSettings,
}

impl ForecastingService {
    pub fn new(
        store: Arc<dyn ForecastStore>,
        forecast: ForecastSettings,
        reorder: ReorderSettings,
    ) -> Self {
        Self {
            store,
            forecast,
            reorder,
        }
    }

    async fn require_store(&self, store_id: Uuid) -> Result<Store, ServiceError> {
        self.store
            .find_store(store_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store with ID {} not found", store_id)))
    }

    /// Forecasts every active SKU of the store's organization and replaces the stored
    /// forecast of each.
    pub async fn run_store_forecasts(&self, store_id: Uuid) -> Result<ForecastRunReport, ServiceError> {
        self.run_store_forecasts_at(store_id, Utc::now()).await
    }

    #[instrument(skip(self, now))]
    pub async fn run_store_forecasts_at(
        &self,
        store_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ForecastRunReport, ServiceError> {
        let started = Instant::now();
        let store = self.require_store(store_id).await?;
        let skus = self.store.list_active_skus(store.organization_id).await?;

        let from = now - Duration::days(i64::from(self.forecast.history_window_days));
        let sales = self.store.list_sales(store_id, from, now).await?;
        let mut by_sku: BTreeMap<Uuid, Vec<DemandPoint>> = BTreeMap::new();
        for record in &sales {
            by_sku
                .entry(record.sku_id)
                .or_default()
                .push(DemandPoint::from(record));
        }

        let mut report = ForecastRunReport {
            store_id,
            ..Default::default()
        };

        for sku in &skus {
            report.processed += 1;
            let points = by_sku.get(&sku.id).map(Vec::as_slice).unwrap_or_default();
            match self.forecast_sku(store_id, sku, points, now).await {
                Ok(()) => {
                    report.succeeded += 1;
                    counter!("forecast.skus.succeeded", 1);
                }
                Err(err) => {
                    warn!(
                        store_id = %store_id,
                        sku_id = %sku.id,
                        sku_code = %sku.code,
                        error = %err,
                        "Forecast failed for SKU"
                    );
                    counter!("forecast.skus.failed", 1);
                    report.failed += 1;
                    report.failures.push(SkuFailure {
                        sku_id: sku.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        histogram!(
            "forecast.run.duration_ms",
            started.elapsed().as_secs_f64() * 1000.0
        );
        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            "Forecast run finished"
        );
        Ok(report)
    }

    async fn forecast_sku(
        &self,
        store_id: Uuid,
        sku: &Sku,
        points: &[DemandPoint],
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let history: Vec<DemandPoint> = daily_aggregate(points)
            .into_iter()
            .map(|day| day.to_point())
            .collect();

        let payload = generate_forecast(&history, self.forecast.horizon_hours, &self.forecast)?;
        debug!(
            sku_id = %sku.id,
            model = %payload.metadata.model,
            days = payload.median.len(),
            "Forecast computed"
        );

        let forecast = payload.into_forecast(store_id, sku.id, self.forecast.horizon_hours, now);
        self.store.upsert_forecast(forecast).await
    }

    /// Applies the reorder engine to every current inventory row of the store and
    /// persists the triggered suggestions as pending.
    #[instrument(skip(self))]
    pub async fn generate_reorder_suggestions(
        &self,
        store_id: Uuid,
    ) -> Result<ReorderRunReport, ServiceError> {
        let store = self.require_store(store_id).await?;
        let inventory = self.store.list_inventory(store_id).await?;

        let mut report = ReorderRunReport {
            store_id,
            ..Default::default()
        };

        for row in &inventory {
            report.evaluated += 1;
            match self.reorder_row(&store, row).await {
                Ok(ReorderOutcome::Created) => report.created += 1,
                Ok(ReorderOutcome::NotTriggered) => report.not_triggered += 1,
                Ok(ReorderOutcome::Suppressed) => report.suppressed += 1,
                Ok(ReorderOutcome::Skipped) => report.skipped += 1,
                Err(err) => {
                    warn!(
                        store_id = %store_id,
                        sku_id = %row.sku_id,
                        error = %err,
                        "Reorder evaluation failed for SKU"
                    );
                    report.failed += 1;
                    report.failures.push(SkuFailure {
                        sku_id: row.sku_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            evaluated = report.evaluated,
            created = report.created,
            skipped = report.skipped,
            failed = report.failed,
            "Reorder run finished"
        );
        Ok(report)
    }

    async fn reorder_row(
        &self,
        store: &Store,
        row: &InventorySnapshot,
    ) -> Result<ReorderOutcome, ServiceError> {
        let sku = match self.store.find_sku(row.sku_id).await? {
            Some(sku) if sku.organization_id == store.organization_id => sku,
            Some(_) => {
                warn!(sku_id = %row.sku_id, "SKU belongs to another organization");
                return Ok(ReorderOutcome::Skipped);
            }
            None => {
                debug!(sku_id = %row.sku_id, "No SKU master data");
                return Ok(ReorderOutcome::Skipped);
            }
        };

        if let Some(open) = self
            .store
            .find_pending_reorder_suggestion(store.id, sku.id)
            .await?
        {
            debug!(sku_id = %sku.id, suggestion_id = %open.id, "Pending suggestion awaits review");
            return Ok(ReorderOutcome::Skipped);
        }

        let Some(forecast) = self.store.find_forecast(store.id, sku.id).await? else {
            debug!(sku_id = %sku.id, "No forecast yet");
            return Ok(ReorderOutcome::Skipped);
        };

        let Some(plan) = suggest_reorder(&forecast, row, sku.lead_time_days, &self.reorder)? else {
            return Ok(ReorderOutcome::NotTriggered);
        };

        if plan.suggested_qty <= 0 && !self.reorder.persist_non_positive {
            debug!(
                sku_id = %sku.id,
                suggested_qty = plan.suggested_qty,
                "Triggered without a positive quantity"
            );
            return Ok(ReorderOutcome::Suppressed);
        }

        let suggestion = ReorderSuggestion {
            id: Uuid::new_v4(),
            store_id: store.id,
            sku_id: sku.id,
            suggested_qty: plan.suggested_qty,
            safety_stock: plan.safety_stock,
            lead_time_days: plan.lead_time_days,
            rationale: plan.rationale,
            status: ReorderStatus::Pending,
        };
        info!(
            sku_id = %sku.id,
            suggested_qty = suggestion.suggested_qty,
            aggressive_qty = suggestion.rationale.aggressive_qty(),
            "Reorder suggested"
        );
        self.store.insert_reorder_suggestion(suggestion).await?;
        counter!("reorder.suggestions.created", 1);
        Ok(ReorderOutcome::Created)
    }

    /// Approves or rejects a pending suggestion.
    #[instrument(skip(self))]
    pub async fn process_reorder_action(
        &self,
        suggestion_id: Uuid,
        action: ReorderAction,
    ) -> Result<ReorderSuggestion, ServiceError> {
        let mut suggestion = self
            .store
            .find_reorder_suggestion(suggestion_id)
            .await?
            .ok_or_else(|| ServiceError::suggestion_not_found(suggestion_id))?;

        if suggestion.status != ReorderStatus::Pending {
            return Err(ServiceError::not_pending(
                "Reorder suggestion",
                suggestion_id,
                suggestion.status,
            ));
        }

        let status = action.target_status();
        self.store
            .update_reorder_status(suggestion_id, status)
            .await?;
        suggestion.status = status;
        info!(suggestion_id = %suggestion_id, status = %status, "Reorder suggestion reviewed");
        Ok(suggestion)
    }
}
