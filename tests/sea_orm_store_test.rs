mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use inventory_forecast::{
    entities::forecast,
    errors::ServiceError,
    models::{AnomalyAction, AnomalyStatus, ReorderAction, ReorderStatus},
    repositories::ForecastStore,
    services::{AnomalyDetectionService, ForecastingService},
};
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

use common::{inventory, now, sales_history, sku, store, test_config, SqliteHarness};

#[tokio::test]
async fn catalog_queries_filter_and_order() {
    let harness = SqliteHarness::new().await;
    let db = &harness.store;
    let shop = store();
    let mut late = sku(&shop, "ZETA", 4);
    late.price = Some(dec!(12.50));
    let early = sku(&shop, "ALPHA", 2);
    let mut retired = sku(&shop, "MIDDLE", 2);
    retired.active = false;

    db.insert_store(&shop).await.unwrap();
    for item in [&late, &early, &retired] {
        db.insert_sku(item).await.unwrap();
    }

    let found = db.find_store(shop.id).await.unwrap().unwrap();
    assert_eq!(found, shop);
    assert!(db.find_store(Uuid::new_v4()).await.unwrap().is_none());

    let codes: Vec<String> = db
        .list_active_skus(shop.organization_id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.code)
        .collect();
    assert_eq!(codes, vec!["ALPHA".to_string(), "ZETA".to_string()]);

    let fetched = db.find_sku(early.id).await.unwrap().unwrap();
    assert_eq!(fetched.lead_time_days, 2);
}

#[tokio::test]
async fn sales_are_returned_in_range_and_ascending() {
    let harness = SqliteHarness::new().await;
    let db = &harness.store;
    let shop = store();
    let item = sku(&shop, "A", 1);
    db.insert_sales(&sales_history(&shop, &item, 10, |d| d as f64))
        .await
        .unwrap();

    let sales = db
        .list_sales(shop.id, now() - Duration::days(5), now())
        .await
        .unwrap();
    let quantities: Vec<f64> = sales.iter().map(|s| s.quantity).collect();
    assert_eq!(quantities, vec![5.0, 4.0, 3.0, 2.0, 1.0]);
    assert!(sales.windows(2).all(|w| w[0].sold_at <= w[1].sold_at));
}

#[tokio::test]
async fn inventory_upsert_overwrites_the_row() {
    let harness = SqliteHarness::new().await;
    let db = &harness.store;
    let shop = store();
    let item = sku(&shop, "A", 1);

    db.upsert_inventory(&inventory(&shop, &item, 10, 0)).await.unwrap();
    db.upsert_inventory(&inventory(&shop, &item, -2, 1)).await.unwrap();

    let rows = db.list_inventory(shop.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].on_hand, -2);
    assert_eq!(rows[0].reserved, 1);
}

#[tokio::test]
async fn forecast_run_keeps_one_row_per_sku() {
    let harness = SqliteHarness::new().await;
    let db = &harness.store;
    let shop = store();
    let item = sku(&shop, "FLAT", 5);
    db.insert_store(&shop).await.unwrap();
    db.insert_sku(&item).await.unwrap();
    db.insert_sales(&sales_history(&shop, &item, 35, |_| 10.0))
        .await
        .unwrap();

    let cfg = test_config();
    let service = ForecastingService::new(harness.store.clone(), cfg.forecast, cfg.reorder);
    service.run_store_forecasts_at(shop.id, now()).await.unwrap();
    service.run_store_forecasts_at(shop.id, now()).await.unwrap();

    let rows = forecast::Entity::find()
        .count(db.connection())
        .await
        .unwrap();
    assert_eq!(rows, 1);

    let stored = db.find_forecast(shop.id, item.id).await.unwrap().unwrap();
    assert_eq!(stored.median, vec![10.0; 7]);
    assert_eq!(stored.horizon_hours, 168);
    assert_eq!(stored.generated_at, now());

    db.upsert_inventory(&inventory(&shop, &item, 30, 0)).await.unwrap();
    let report = service.generate_reorder_suggestions(shop.id).await.unwrap();
    assert_eq!(report.created, 1);

    // suggestion id is not in the report, so approve through the store
    let suggestion = {
        use inventory_forecast::entities::reorder_suggestion;
        let row = reorder_suggestion::Entity::find()
            .one(db.connection())
            .await
            .unwrap()
            .unwrap();
        db.find_reorder_suggestion(row.id).await.unwrap().unwrap()
    };
    assert_eq!(suggestion.suggested_qty, 30);
    assert_eq!(suggestion.rationale.aggressive_qty(), 55);

    let approved = service
        .process_reorder_action(suggestion.id, ReorderAction::Approve)
        .await
        .unwrap();
    assert_eq!(approved.status, ReorderStatus::Approved);
    let reloaded = db.find_reorder_suggestion(suggestion.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, ReorderStatus::Approved);
}

#[tokio::test]
async fn anomaly_upsert_preserves_resolution() {
    let harness = SqliteHarness::new().await;
    let db = &harness.store;
    let shop = store();
    let item = sku(&shop, "NEG", 1);
    db.insert_store(&shop).await.unwrap();
    db.upsert_inventory(&inventory(&shop, &item, -4, 0)).await.unwrap();

    let service = AnomalyDetectionService::new(harness.store.clone(), test_config().anomaly);
    let report = service.detect_anomalies_at(shop.id, now()).await.unwrap();
    assert_eq!(report.summary.total, 1);
    service.persist_anomalies(&report).await.unwrap();

    let id = report.anomalies[0].id;
    service
        .process_anomaly_action_at(id, AnomalyAction::Accept, now())
        .await
        .unwrap();
    service.persist_anomalies(&report).await.unwrap();

    let stored = db.find_anomaly(id).await.unwrap().unwrap();
    assert_eq!(stored.status, AnomalyStatus::Accepted);
    assert_eq!(stored.resolved_at, Some(now()));
    assert_eq!(stored.description, report.anomalies[0].description);
}

#[tokio::test]
async fn status_updates_on_missing_records_are_not_found() {
    let harness = SqliteHarness::new().await;
    let db = &harness.store;

    let err = db
        .update_anomaly_status(Uuid::new_v4(), AnomalyStatus::Ignored, Some(now()))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = db
        .update_reorder_status(Uuid::new_v4(), ReorderStatus::Rejected)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn status_updates_only_apply_to_pending_records() {
    let harness = SqliteHarness::new().await;
    let db = &harness.store;
    let shop = store();
    let item = sku(&shop, "NEG", 1);
    db.insert_store(&shop).await.unwrap();
    db.upsert_inventory(&inventory(&shop, &item, -4, 0)).await.unwrap();

    let service = AnomalyDetectionService::new(harness.store.clone(), test_config().anomaly);
    let report = service.detect_anomalies_at(shop.id, now()).await.unwrap();
    service.persist_anomalies(&report).await.unwrap();
    let id = report.anomalies[0].id;

    db.update_anomaly_status(id, AnomalyStatus::Accepted, Some(now()))
        .await
        .unwrap();
    let err = db
        .update_anomaly_status(id, AnomalyStatus::Ignored, Some(now() + Duration::hours(1)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));

    let stored = db.find_anomaly(id).await.unwrap().unwrap();
    assert_eq!(stored.status, AnomalyStatus::Accepted);
    assert_eq!(stored.resolved_at, Some(now()));
}

#[tokio::test]
async fn reorder_runs_do_not_stack_pending_suggestions() {
    let harness = SqliteHarness::new().await;
    let db = &harness.store;
    let shop = store();
    let item = sku(&shop, "FLAT", 5);
    db.insert_store(&shop).await.unwrap();
    db.insert_sku(&item).await.unwrap();
    db.insert_sales(&sales_history(&shop, &item, 35, |_| 10.0))
        .await
        .unwrap();
    db.upsert_inventory(&inventory(&shop, &item, 30, 0)).await.unwrap();

    let cfg = test_config();
    let service = ForecastingService::new(harness.store.clone(), cfg.forecast, cfg.reorder);
    service.run_store_forecasts_at(shop.id, now()).await.unwrap();
    assert_eq!(service.generate_reorder_suggestions(shop.id).await.unwrap().created, 1);
    let rerun = service.generate_reorder_suggestions(shop.id).await.unwrap();
    assert_eq!(rerun.created, 0);
    assert_eq!(rerun.skipped, 1);

    let pending = db
        .find_pending_reorder_suggestion(shop.id, item.id)
        .await
        .unwrap()
        .unwrap();
    db.update_reorder_status(pending.id, ReorderStatus::Rejected)
        .await
        .unwrap();
    let err = db
        .update_reorder_status(pending.id, ReorderStatus::Approved)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
    assert!(db
        .find_pending_reorder_suggestion(shop.id, item.id)
        .await
        .unwrap()
        .is_none());
}
