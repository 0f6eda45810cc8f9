#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use inventory_forecast::{
    config::AppConfig,
    db::{self, DbConfig},
    models::{InventorySnapshot, SalesRecord, Sku, Store},
    repositories::{InMemoryStore, SeaOrmStore},
};
use tempfile::TempDir;
use uuid::Uuid;

/// Fixed evaluation time, a Sunday at noon UTC.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

pub fn test_config() -> AppConfig {
    AppConfig::new("sqlite::memory:".to_string(), "test".to_string())
}

pub fn store() -> Store {
    Store {
        id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        name: "Test Store".to_string(),
    }
}

pub fn sku(store: &Store, code: &str, lead_time_days: u32) -> Sku {
    Sku {
        id: Uuid::new_v4(),
        organization_id: store.organization_id,
        code: code.to_string(),
        lead_time_days,
        price: None,
        active: true,
    }
}

/// One sale per day for `days` days ending yesterday, quantity chosen per day offset.
pub fn sales_history(
    store: &Store,
    sku: &Sku,
    days: i64,
    quantity: impl Fn(i64) -> f64,
) -> Vec<SalesRecord> {
    (1..=days)
        .map(|days_ago| SalesRecord {
            id: Uuid::new_v4(),
            store_id: store.id,
            sku_id: sku.id,
            sold_at: now() - Duration::days(days_ago),
            quantity: quantity(days_ago),
            price: None,
            promo: None,
        })
        .collect()
}

pub fn inventory(store: &Store, sku: &Sku, on_hand: i64, reserved: i64) -> InventorySnapshot {
    InventorySnapshot {
        store_id: store.id,
        sku_id: sku.id,
        on_hand,
        reserved,
        last_counted_at: Some(now() - Duration::days(1)),
    }
}

pub fn memory_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

/// SQLite database in a temporary directory with the schema created.
pub struct SqliteHarness {
    pub store: Arc<SeaOrmStore>,
    _dir: TempDir,
}

impl SqliteHarness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("forecast.db");
        let config = DbConfig {
            url: format!("sqlite://{}?mode=rwc", path.display()),
            max_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&config)
            .await
            .expect("connect sqlite");
        db::create_schema(&pool).await.expect("create schema");

        Self {
            store: Arc::new(SeaOrmStore::new(Arc::new(pool))),
            _dir: dir,
        }
    }
}
