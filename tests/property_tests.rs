//! Property-based tests for the forecasting and anomaly engines.
//!
//! These use proptest to check invariants that must hold for any sales history,
//! not just the hand-picked cases in the unit tests.

use chrono::{Duration, TimeZone, Utc};
use inventory_forecast::config::{AnomalySettings, ForecastSettings};
use inventory_forecast::ml::statistics::{mean, weekday_counts, weekly_seasonality};
use inventory_forecast::ml::{detect_demand_anomalies, generate_forecast};
use inventory_forecast::models::{DemandPoint, ForecastModel};
use proptest::prelude::*;
use uuid::Uuid;

fn daily_points(quantities: &[f64]) -> Vec<DemandPoint> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    quantities
        .iter()
        .enumerate()
        .map(|(i, q)| DemandPoint::new(start + Duration::days(i as i64), *q))
        .collect()
}

fn quantities_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..500.0, min_len..max_len)
}

fn horizon_strategy() -> impl Strategy<Value = u32> {
    1u32..=720
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn bands_are_ordered_and_non_negative(
        quantities in quantities_strategy(0, 60),
        horizon in horizon_strategy(),
    ) {
        let payload = generate_forecast(&daily_points(&quantities), horizon, &ForecastSettings::default())
            .unwrap();
        for i in 0..payload.median.len() {
            prop_assert!(payload.p10[i] <= payload.median[i] + 1e-9);
            prop_assert!(payload.median[i] <= payload.p90[i] + 1e-9);
            prop_assert!(payload.median[i] >= 0.0);
            prop_assert!(payload.p10[i] >= 0.0);
        }
    }

    #[test]
    fn band_lengths_match_horizon(
        quantities in quantities_strategy(0, 60),
        horizon in horizon_strategy(),
    ) {
        let payload = generate_forecast(&daily_points(&quantities), horizon, &ForecastSettings::default())
            .unwrap();
        let days = horizon.div_ceil(24) as usize;
        prop_assert_eq!(payload.median.len(), days);
        prop_assert_eq!(payload.p10.len(), days);
        prop_assert_eq!(payload.p90.len(), days);
    }

    #[test]
    fn short_histories_never_use_the_seasonal_model(
        quantities in quantities_strategy(0, 7),
        horizon in horizon_strategy(),
    ) {
        let payload = generate_forecast(&daily_points(&quantities), horizon, &ForecastSettings::default())
            .unwrap();
        prop_assert_eq!(payload.metadata.model, ForecastModel::Baseline);
    }

    #[test]
    fn accuracy_is_a_percentage(quantities in quantities_strategy(7, 60)) {
        let payload = generate_forecast(&daily_points(&quantities), 168, &ForecastSettings::default())
            .unwrap();
        prop_assert_eq!(payload.metadata.model, ForecastModel::WeeklySeasonal);
        let accuracy = payload.metadata.accuracy.unwrap();
        prop_assert!((0.0..=100.0).contains(&accuracy));
    }

    #[test]
    fn weighted_seasonality_sums_to_zero(quantities in quantities_strategy(1, 90)) {
        let series = daily_points(&quantities);
        let overall = mean(&quantities).unwrap();
        let season = weekly_seasonality(&series, overall);
        let counts = weekday_counts(&series);
        let weighted: f64 = season
            .iter()
            .zip(counts.iter())
            .map(|(deviation, count)| deviation * *count as f64)
            .sum();
        prop_assert!(weighted.abs() < 1e-6 * (1.0 + overall * quantities.len() as f64));
    }

    #[test]
    fn demand_detection_is_deterministic(quantities in quantities_strategy(0, 45)) {
        let series = daily_points(&quantities);
        let now = Utc.with_ymd_and_hms(2024, 6, 20, 0, 0, 0).unwrap();
        let settings = AnomalySettings::default();
        let (store, sku) = (Uuid::nil(), Uuid::from_u128(7));
        let first = detect_demand_anomalies(store, sku, &series, &settings, now).unwrap();
        let second = detect_demand_anomalies(store, sku, &series, &settings, now).unwrap();
        prop_assert_eq!(first, second);
    }
}
