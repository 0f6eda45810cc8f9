use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use inventory_forecast::config::{AnomalySettings, ForecastSettings, ReorderSettings};
use inventory_forecast::ml::{detect_demand_anomalies, generate_forecast, suggest_reorder};
use inventory_forecast::models::{DemandPoint, InventorySnapshot};
use std::time::Duration;
use uuid::Uuid;

fn history(days: usize) -> Vec<DemandPoint> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..days)
        .map(|i| {
            let weekly = [12.0, 9.0, 10.0, 11.0, 13.0, 20.0, 18.0][i % 7];
            let noise = ((i * 37) % 11) as f64 - 5.0;
            DemandPoint::new(start + ChronoDuration::days(i as i64), weekly + noise)
        })
        .collect()
}

// Seasonal fit, bands and backtest
fn forecast_benchmark(c: &mut Criterion) {
    let settings = ForecastSettings::default();
    let mut group = c.benchmark_group("generate_forecast");

    for days in [30usize, 90, 365].iter() {
        let series = history(*days);
        group.bench_with_input(BenchmarkId::from_parameter(days), &series, |b, series| {
            b.iter(|| generate_forecast(black_box(series), black_box(168), &settings))
        });
    }

    group.finish();
}

fn reorder_benchmark(c: &mut Criterion) {
    let forecast = generate_forecast(&history(30), 168, &ForecastSettings::default())
        .unwrap()
        .into_forecast(Uuid::nil(), Uuid::nil(), 168, Utc::now());
    let snapshot = InventorySnapshot {
        store_id: Uuid::nil(),
        sku_id: Uuid::nil(),
        on_hand: 40,
        reserved: 5,
        last_counted_at: None,
    };
    let settings = ReorderSettings::default();

    c.bench_function("suggest_reorder", |b| {
        b.iter(|| suggest_reorder(black_box(&forecast), black_box(&snapshot), 5, &settings))
    });
}

fn anomaly_benchmark(c: &mut Criterion) {
    let series = history(30);
    let settings = AnomalySettings::default();
    let now = Utc::now();

    c.bench_function("detect_demand_anomalies", |b| {
        b.iter(|| {
            detect_demand_anomalies(Uuid::nil(), Uuid::nil(), black_box(&series), &settings, now)
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(5))
        .sample_size(100);
    targets =
        forecast_benchmark,
        reorder_benchmark,
        anomaly_benchmark
}

criterion_main!(benches);
