//! Demand and inventory anomaly detection.
//!
//! Demand checks run on daily totals of one SKU's sales; inventory checks run on a
//! single current snapshot. Both are deterministic: the same inputs and `now` yield
//! the same anomalies, including their ids.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::config::AnomalySettings;
use crate::errors::ForecastError;
use crate::ml::statistics::{daily_aggregate, ensure_finite, mean, stddev, DailyTotal};
use crate::models::{
    Anomaly, AnomalyStatus, AnomalyType, DemandPoint, InventorySnapshot, Severity,
};

const SUNDAY: usize = 0;
const SATURDAY: usize = 6;

/// Saturday and Sunday, with Sunday-based day indices.
pub fn is_weekend(day_of_week: usize) -> bool {
    day_of_week == SUNDAY || day_of_week == SATURDAY
}

/// Stable id for an anomaly of `kind` about `date`, so re-runs upsert instead of
/// duplicating.
pub fn anomaly_id(store_id: Uuid, sku_id: Uuid, kind: AnomalyType, date: NaiveDate) -> Uuid {
    let key = format!("{}:{}:{}:{}", store_id, sku_id, kind, date);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}

struct AnomalyFactory {
    store_id: Uuid,
    sku_id: Uuid,
    detected_at: DateTime<Utc>,
}

impl AnomalyFactory {
    fn build(
        &self,
        kind: AnomalyType,
        severity: Severity,
        date: NaiveDate,
        description: String,
    ) -> Anomaly {
        Anomaly {
            id: anomaly_id(self.store_id, self.sku_id, kind, date),
            store_id: self.store_id,
            sku_id: self.sku_id,
            anomaly_type: kind,
            severity,
            description,
            status: AnomalyStatus::Pending,
            detected_at: self.detected_at,
            resolved_at: None,
        }
    }
}

/// Severity of a daily quantity against the window statistics, or `None` when it is
/// not a spike. A spike must clear both `threshold` and `spike_mean_multiple · mean`.
pub fn classify_spike(
    daily_qty: f64,
    mean: f64,
    threshold: f64,
    settings: &AnomalySettings,
) -> Option<Severity> {
    if daily_qty > threshold && daily_qty > settings.spike_mean_multiple * mean {
        if daily_qty > settings.high_spike_multiple * mean {
            Some(Severity::High)
        } else {
            Some(Severity::Medium)
        }
    } else {
        None
    }
}

/// Severity of a recent average against the window mean, or `None` when it is not a
/// drop. Windows averaging `drop_min_mean` or less are never flagged.
pub fn classify_drop(recent_avg: f64, mean: f64, settings: &AnomalySettings) -> Option<Severity> {
    if recent_avg < settings.drop_ratio * mean && mean > settings.drop_min_mean {
        if recent_avg < settings.high_drop_ratio * mean {
            Some(Severity::High)
        } else {
            Some(Severity::Medium)
        }
    } else {
        None
    }
}

/// Weekend to weekday average ratio, when both sides have enough days.
///
/// Weekend-only demand yields an infinite ratio; no demand on either side yields `None`.
pub fn weekend_ratio(daily: &[DailyTotal], settings: &AnomalySettings) -> Option<f64> {
    let (weekend, weekday): (Vec<&DailyTotal>, Vec<&DailyTotal>) = daily
        .iter()
        .partition(|d| is_weekend(d.to_point().day_of_week()));

    if weekday.len() < settings.min_weekday_observations
        || weekend.len() < settings.min_weekend_observations
    {
        return None;
    }

    let weekday_avg = weekday.iter().map(|d| d.quantity).sum::<f64>() / weekday.len() as f64;
    let weekend_avg = weekend.iter().map(|d| d.quantity).sum::<f64>() / weekend.len() as f64;
    if weekday_avg <= 0.0 {
        return (weekend_avg > 0.0).then_some(f64::INFINITY);
    }
    Some(weekend_avg / weekday_avg)
}

/// Spike, drop and weekday/weekend pattern checks for one SKU.
///
/// `sales` may hold several observations per day; they are aggregated to daily totals
/// first. SKUs with fewer than `min_days` sales days are skipped.
pub fn detect_demand_anomalies(
    store_id: Uuid,
    sku_id: Uuid,
    sales: &[DemandPoint],
    settings: &AnomalySettings,
    now: DateTime<Utc>,
) -> Result<Vec<Anomaly>, ForecastError> {
    let daily = daily_aggregate(sales);
    if daily.len() < settings.min_days {
        return Ok(Vec::new());
    }

    let quantities: Vec<f64> = daily.iter().map(|d| d.quantity).collect();
    let window_mean = ensure_finite(mean(&quantities)?, "daily mean")?;
    let window_sd = ensure_finite(stddev(&quantities, window_mean)?, "daily stddev")?;
    let threshold = window_mean + settings.spike_sigma * window_sd;

    let factory = AnomalyFactory {
        store_id,
        sku_id,
        detected_at: now,
    };
    let mut anomalies = Vec::new();

    let recent = &daily[daily.len().saturating_sub(settings.recent_days)..];
    for day in recent {
        if let Some(severity) = classify_spike(day.quantity, window_mean, threshold, settings) {
            anomalies.push(factory.build(
                AnomalyType::DemandSpike,
                severity,
                day.date,
                format!(
                    "Demand spike on {}: {:.0} units vs a daily average of {:.1} ({:.1}x)",
                    day.date,
                    day.quantity,
                    window_mean,
                    day.quantity / window_mean
                ),
            ));
        }
    }

    let recent_quantities: Vec<f64> = recent.iter().map(|d| d.quantity).collect();
    let recent_avg = mean(&recent_quantities)?;
    let last_date = recent
        .last()
        .map(|d| d.date)
        .ok_or_else(|| ForecastError::insufficient("no recent sales days"))?;

    if let Some(severity) = classify_drop(recent_avg, window_mean, settings) {
        anomalies.push(factory.build(
            AnomalyType::DemandDrop,
            severity,
            last_date,
            format!(
                "Demand dropped to {:.1} units/day over the last {} days, {:.0}% below the daily average of {:.1}",
                recent_avg,
                recent.len(),
                (1.0 - recent_avg / window_mean) * 100.0,
                window_mean
            ),
        ));
    }

    if let Some(ratio) = weekend_ratio(&daily, settings) {
        if ratio > settings.weekend_high_ratio || ratio < settings.weekend_low_ratio {
            let description = if ratio.is_infinite() {
                "Weekend-only demand: no weekday sales in the window".to_string()
            } else {
                let deviation = (ratio - 1.0) * 100.0;
                let direction = if deviation >= 0.0 { "higher" } else { "lower" };
                format!(
                    "Weekend demand is {:.0}% {} than weekday demand",
                    deviation.abs(),
                    direction
                )
            };
            anomalies.push(factory.build(
                AnomalyType::PatternChange,
                Severity::Medium,
                last_date,
                description,
            ));
        }
    }

    Ok(anomalies)
}

/// Data quality checks on one inventory snapshot.
pub fn detect_inventory_anomalies(
    snapshot: &InventorySnapshot,
    settings: &AnomalySettings,
    now: DateTime<Utc>,
) -> Vec<Anomaly> {
    let factory = AnomalyFactory {
        store_id: snapshot.store_id,
        sku_id: snapshot.sku_id,
        detected_at: now,
    };
    let today = now.date_naive();
    let mut anomalies = Vec::new();

    if snapshot.on_hand < 0 {
        anomalies.push(factory.build(
            AnomalyType::NegativeStock,
            Severity::High,
            today,
            format!("On-hand quantity is negative ({})", snapshot.on_hand),
        ));
    }

    if let Some(last_counted_at) = snapshot.last_counted_at {
        let days_since_count = (now - last_counted_at).num_days();
        if days_since_count > settings.stale_days {
            let severity = if days_since_count > settings.very_stale_days {
                Severity::Medium
            } else {
                Severity::Low
            };
            anomalies.push(factory.build(
                AnomalyType::StaleInventory,
                severity,
                today,
                format!("Inventory last counted {} days ago", days_since_count),
            ));
        }
    }

    if snapshot.on_hand > 0
        && snapshot.reserved as f64 > settings.reserved_ratio * snapshot.on_hand as f64
    {
        anomalies.push(factory.build(
            AnomalyType::ExcessiveReserved,
            Severity::Medium,
            today,
            format!(
                "{} of {} on-hand units are reserved ({:.0}%)",
                snapshot.reserved,
                snapshot.on_hand,
                snapshot.reserved as f64 / snapshot.on_hand as f64 * 100.0
            ),
        ));
    }

    anomalies
}
