//! Reorder recommendation from a forecast and the current stock position.

use serde::{Deserialize, Serialize};

use crate::config::ReorderSettings;
use crate::errors::ForecastError;
use crate::ml::statistics::ensure_finite;
use crate::models::{Forecast, InventorySnapshot, ReorderAlternatives, ReorderRationale};

/// Tolerance for float noise before rounding up, e.g. `140.0 * 0.2`.
const CEIL_EPSILON: f64 = 1e-9;

/// A triggered reorder, before it is bound to an id and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderPlan {
    pub suggested_qty: i64,
    pub safety_stock: i64,
    pub lead_time_days: u32,
    pub rationale: ReorderRationale,
}

fn ceil_qty(value: f64) -> i64 {
    (value - CEIL_EPSILON).ceil() as i64
}

fn lead_time_sum(values: &[f64], lead_time_days: u32) -> f64 {
    let n = (lead_time_days as usize).min(values.len());
    values[..n].iter().sum()
}

/// Decides whether `inventory` needs a reorder given the demand in `forecast`.
///
/// Returns `Ok(None)` when available stock is above the reorder point. The
/// conservative quantity covers P90 demand over the lead time; the aggressive
/// alternative covers 1.5x median demand and is not clamped.
pub fn suggest_reorder(
    forecast: &Forecast,
    inventory: &InventorySnapshot,
    lead_time_days: u32,
    settings: &ReorderSettings,
) -> Result<Option<ReorderPlan>, ForecastError> {
    let lead_time_demand = ensure_finite(
        lead_time_sum(&forecast.median, lead_time_days),
        "lead time demand",
    )?;
    let conservative_demand = ensure_finite(
        lead_time_sum(&forecast.p90, lead_time_days),
        "conservative demand",
    )?;

    let safety_stock = ceil_qty(lead_time_demand * settings.safety_stock_ratio);
    let available_stock = inventory.available();
    let reorder_point = lead_time_demand + safety_stock as f64;

    if available_stock as f64 > reorder_point {
        return Ok(None);
    }

    let conservative_qty =
        ceil_qty(conservative_demand + safety_stock as f64 - available_stock as f64);
    let aggressive_qty = ceil_qty(
        lead_time_demand * settings.aggressive_multiplier + safety_stock as f64
            - available_stock as f64,
    );

    Ok(Some(ReorderPlan {
        suggested_qty: conservative_qty,
        safety_stock,
        lead_time_days,
        rationale: ReorderRationale::Conservative {
            lead_time_demand,
            available_stock,
            reorder_point,
            alternatives: ReorderAlternatives {
                aggressive: aggressive_qty,
            },
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForecastMetadata, ForecastModel};
    use chrono::Utc;
    use rstest::rstest;
    use uuid::Uuid;

    fn forecast(median: Vec<f64>, p90: Vec<f64>) -> Forecast {
        Forecast {
            id: Uuid::new_v4(),
            store_id: Uuid::nil(),
            sku_id: Uuid::nil(),
            horizon_hours: (median.len() * 24) as u32,
            generated_at: Utc::now(),
            p10: median.clone(),
            median,
            p90,
            metadata: ForecastMetadata {
                model: ForecastModel::WeeklySeasonal,
                accuracy: None,
                note: None,
            },
        }
    }

    fn inventory(on_hand: i64, reserved: i64) -> InventorySnapshot {
        InventorySnapshot {
            store_id: Uuid::nil(),
            sku_id: Uuid::nil(),
            on_hand,
            reserved,
            last_counted_at: None,
        }
    }

    #[test]
    fn low_available_stock_triggers_reorder() {
        let fc = forecast(vec![20.0; 7], vec![25.0; 7]);
        let plan = suggest_reorder(&fc, &inventory(100, 90), 7, &ReorderSettings::default())
            .unwrap()
            .expect("reorder should trigger");

        assert_eq!(plan.safety_stock, 28);
        assert_eq!(plan.lead_time_days, 7);
        // 175 + 28 - 10
        assert_eq!(plan.suggested_qty, 193);
        match plan.rationale {
            ReorderRationale::Conservative {
                lead_time_demand,
                available_stock,
                reorder_point,
                alternatives,
            } => {
                assert_eq!(lead_time_demand, 140.0);
                assert_eq!(available_stock, 10);
                assert_eq!(reorder_point, 168.0);
                // 210 + 28 - 10
                assert_eq!(alternatives.aggressive, 228);
            }
        }
    }

    #[rstest]
    #[case(60, true)]
    #[case(59, true)]
    #[case(61, false)]
    fn constant_demand_triggers_at_reorder_point(#[case] available: i64, #[case] expected: bool) {
        // 5 days x 10/day + ceil(0.2 x 50) = 60
        let fc = forecast(vec![10.0; 7], vec![10.0; 7]);
        let plan =
            suggest_reorder(&fc, &inventory(available, 0), 5, &ReorderSettings::default()).unwrap();
        assert_eq!(plan.is_some(), expected);
    }

    #[test]
    fn lead_time_longer_than_forecast_uses_available_days() {
        let fc = forecast(vec![10.0; 3], vec![12.0; 3]);
        let plan = suggest_reorder(&fc, &inventory(0, 0), 14, &ReorderSettings::default())
            .unwrap()
            .unwrap();
        assert_eq!(plan.rationale.aggressive_qty(), 51);
        // 36 + ceil(6) - 0
        assert_eq!(plan.suggested_qty, 42);
    }

    #[test]
    fn negative_available_stock_is_not_clamped() {
        let fc = forecast(vec![1.0; 7], vec![1.0; 7]);
        let plan = suggest_reorder(&fc, &inventory(5, 20), 2, &ReorderSettings::default())
            .unwrap()
            .unwrap();
        // 2 + 1 - (-15)
        assert_eq!(plan.suggested_qty, 18);
    }

    #[test]
    fn aggressive_alternative_can_be_non_positive() {
        // Triggered at exactly the reorder point with a tight P90
        let fc = forecast(vec![10.0; 7], vec![10.0; 7]);
        let plan = suggest_reorder(&fc, &inventory(60, 0), 5, &ReorderSettings::default())
            .unwrap()
            .unwrap();
        assert_eq!(plan.suggested_qty, 0);
        assert_eq!(plan.rationale.aggressive_qty(), 25);

        let settings = ReorderSettings {
            aggressive_multiplier: 1.0,
            ..ReorderSettings::default()
        };
        let plan = suggest_reorder(&fc, &inventory(60, 0), 5, &settings)
            .unwrap()
            .unwrap();
        assert_eq!(plan.rationale.aggressive_qty(), 0);
    }

    #[test]
    fn zero_lead_time_demand_only_triggers_on_empty_stock() {
        let fc = forecast(vec![0.0; 7], vec![0.0; 7]);
        let settings = ReorderSettings::default();
        assert!(suggest_reorder(&fc, &inventory(1, 0), 5, &settings).unwrap().is_none());
        let plan = suggest_reorder(&fc, &inventory(0, 0), 5, &settings).unwrap().unwrap();
        assert_eq!(plan.suggested_qty, 0);
    }
}
