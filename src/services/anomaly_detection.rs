use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AnomalySettings;
use crate::errors::ServiceError;
use crate::ml::{detect_demand_anomalies, detect_inventory_anomalies};
use crate::models::{Anomaly, AnomalyAction, AnomalyReport, AnomalyStatus, DemandPoint};
use crate::repositories::ForecastStore;

/// Scans a store's recent sales and current inventory for anomalies.
///
/// Detection does not write anything; callers decide whether to
/// [`persist_anomalies`](Self::persist_anomalies) the returned report.
#[derive(Clone)]
pub struct AnomalyDetectionService {
    store: Arc<dyn ForecastStore>,
    settings: AnomalySettings,
}

impl AnomalyDetectionService {
    pub fn new(store: Arc<dyn ForecastStore>, settings: AnomalySettings) -> Self {
        Self { store, settings }
    }

    pub async fn detect_anomalies(&self, store_id: Uuid) -> Result<AnomalyReport, ServiceError> {
        self.detect_anomalies_at(store_id, Utc::now()).await
    }

    /// Demand anomalies for every SKU with sales in the window, followed by inventory
    /// anomalies for every inventory row. SKUs are visited in id order, so identical
    /// input yields an identical report.
    #[instrument(skip(self, now))]
    pub async fn detect_anomalies_at(
        &self,
        store_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AnomalyReport, ServiceError> {
        self.store
            .find_store(store_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Store with ID {} not found", store_id)))?;

        let from = now - Duration::days(i64::from(self.settings.window_days));
        let sales = self.store.list_sales(store_id, from, now).await?;
        let mut by_sku: BTreeMap<Uuid, Vec<DemandPoint>> = BTreeMap::new();
        for record in &sales {
            by_sku
                .entry(record.sku_id)
                .or_default()
                .push(DemandPoint::from(record));
        }

        let mut anomalies: Vec<Anomaly> = Vec::new();
        for (sku_id, points) in &by_sku {
            match detect_demand_anomalies(store_id, *sku_id, points, &self.settings, now) {
                Ok(found) => anomalies.extend(found),
                Err(err) => warn!(
                    store_id = %store_id,
                    sku_id = %sku_id,
                    error = %err,
                    "Demand anomaly scan failed for SKU"
                ),
            }
        }

        let inventory = self.store.list_inventory(store_id).await?;
        for snapshot in &inventory {
            anomalies.extend(detect_inventory_anomalies(snapshot, &self.settings, now));
        }

        for anomaly in &anomalies {
            counter!("anomaly.detected", 1, "severity" => anomaly.severity.to_string());
        }

        let report = AnomalyReport::new(anomalies);
        info!(
            total = report.summary.total,
            high = report.summary.high_severity,
            medium = report.summary.medium_severity,
            low = report.summary.low_severity,
            "Anomaly detection finished"
        );
        Ok(report)
    }

    /// Stores the anomalies of a report. Records that already exist keep their status.
    pub async fn persist_anomalies(&self, report: &AnomalyReport) -> Result<(), ServiceError> {
        self.store.insert_anomalies(report.anomalies.clone()).await
    }

    pub async fn process_anomaly_action(
        &self,
        anomaly_id: Uuid,
        action: AnomalyAction,
    ) -> Result<Anomaly, ServiceError> {
        self.process_anomaly_action_at(anomaly_id, action, Utc::now())
            .await
    }

    /// Accepts or ignores a pending anomaly and stamps its resolution time.
    #[instrument(skip(self, now))]
    pub async fn process_anomaly_action_at(
        &self,
        anomaly_id: Uuid,
        action: AnomalyAction,
        now: DateTime<Utc>,
    ) -> Result<Anomaly, ServiceError> {
        let mut anomaly = self
            .store
            .find_anomaly(anomaly_id)
            .await?
            .ok_or_else(|| ServiceError::anomaly_not_found(anomaly_id))?;

        if anomaly.status != AnomalyStatus::Pending {
            return Err(ServiceError::not_pending("Anomaly", anomaly_id, anomaly.status));
        }

        let status = action.target_status();
        self.store
            .update_anomaly_status(anomaly_id, status, Some(now))
            .await?;
        anomaly.status = status;
        anomaly.resolved_at = Some(now);
        info!(anomaly_id = %anomaly_id, status = %status, "Anomaly resolved");
        Ok(anomaly)
    }
}
