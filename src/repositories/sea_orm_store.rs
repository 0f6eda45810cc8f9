use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::ForecastStore;
use crate::entities::{
    anomaly, forecast, inventory_snapshot, reorder_suggestion, sales_record, sku, store,
};
use crate::errors::ServiceError;
use crate::models::{
    Anomaly, AnomalyStatus, Forecast, ForecastMetadata, InventorySnapshot, ReorderRationale,
    ReorderStatus, ReorderSuggestion, SalesRecord, Sku, Store,
};

/// [`ForecastStore`] over a sea-orm connection (Postgres or SQLite).
#[derive(Clone)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn insert_store(&self, store: &Store) -> Result<(), ServiceError> {
        let model = store::ActiveModel {
            id: Set(store.id),
            organization_id: Set(store.organization_id),
            name: Set(store.name.clone()),
        };
        store::Entity::insert(model)
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    pub async fn insert_sku(&self, sku: &Sku) -> Result<(), ServiceError> {
        let model = sku::ActiveModel {
            id: Set(sku.id),
            organization_id: Set(sku.organization_id),
            code: Set(sku.code.clone()),
            lead_time_days: Set(to_i32(sku.lead_time_days, "lead_time_days")?),
            price: Set(sku.price),
            active: Set(sku.active),
        };
        sku::Entity::insert(model)
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    pub async fn insert_sales(&self, records: &[SalesRecord]) -> Result<(), ServiceError> {
        if records.is_empty() {
            return Ok(());
        }
        let models = records.iter().map(|r| sales_record::ActiveModel {
            id: Set(r.id),
            store_id: Set(r.store_id),
            sku_id: Set(r.sku_id),
            sold_at: Set(r.sold_at),
            quantity: Set(r.quantity),
            price: Set(r.price),
            promo: Set(r.promo),
        });
        sales_record::Entity::insert_many(models)
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    pub async fn upsert_inventory(&self, snapshot: &InventorySnapshot) -> Result<(), ServiceError> {
        let model = inventory_snapshot::ActiveModel {
            store_id: Set(snapshot.store_id),
            sku_id: Set(snapshot.sku_id),
            on_hand: Set(snapshot.on_hand),
            reserved: Set(snapshot.reserved),
            last_counted_at: Set(snapshot.last_counted_at),
        };
        inventory_snapshot::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    inventory_snapshot::Column::StoreId,
                    inventory_snapshot::Column::SkuId,
                ])
                .update_columns([
                    inventory_snapshot::Column::OnHand,
                    inventory_snapshot::Column::Reserved,
                    inventory_snapshot::Column::LastCountedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }
}

fn to_i32(value: u32, field: &str) -> Result<i32, ServiceError> {
    i32::try_from(value)
        .map_err(|_| ServiceError::InvalidInput(format!("{} out of range: {}", field, value)))
}

fn to_u32(value: i32, field: &str) -> Result<u32, ServiceError> {
    u32::try_from(value)
        .map_err(|_| ServiceError::SerializationError(format!("negative {}: {}", field, value)))
}

fn parse_enum<T: FromStr>(raw: &str, field: &str) -> Result<T, ServiceError> {
    raw.parse::<T>()
        .map_err(|_| ServiceError::SerializationError(format!("unknown {} '{}'", field, raw)))
}

fn sku_from_model(model: sku::Model) -> Result<Sku, ServiceError> {
    Ok(Sku {
        id: model.id,
        organization_id: model.organization_id,
        code: model.code,
        lead_time_days: to_u32(model.lead_time_days, "lead_time_days")?,
        price: model.price,
        active: model.active,
    })
}

fn forecast_from_model(model: forecast::Model) -> Result<Forecast, ServiceError> {
    Ok(Forecast {
        id: model.id,
        store_id: model.store_id,
        sku_id: model.sku_id,
        horizon_hours: to_u32(model.horizon_hours, "horizon_hours")?,
        generated_at: model.generated_at,
        median: serde_json::from_value(model.median)?,
        p10: serde_json::from_value(model.p10)?,
        p90: serde_json::from_value(model.p90)?,
        metadata: serde_json::from_value::<ForecastMetadata>(model.metadata)?,
    })
}

fn suggestion_from_model(model: reorder_suggestion::Model) -> Result<ReorderSuggestion, ServiceError> {
    Ok(ReorderSuggestion {
        id: model.id,
        store_id: model.store_id,
        sku_id: model.sku_id,
        suggested_qty: model.suggested_qty,
        safety_stock: model.safety_stock,
        lead_time_days: to_u32(model.lead_time_days, "lead_time_days")?,
        rationale: serde_json::from_value::<ReorderRationale>(model.rationale)?,
        status: parse_enum(&model.status, "reorder status")?,
    })
}

fn anomaly_from_model(model: anomaly::Model) -> Result<Anomaly, ServiceError> {
    Ok(Anomaly {
        id: model.id,
        store_id: model.store_id,
        sku_id: model.sku_id,
        anomaly_type: parse_enum(&model.anomaly_type, "anomaly type")?,
        severity: parse_enum(&model.severity, "severity")?,
        description: model.description,
        status: parse_enum(&model.status, "anomaly status")?,
        detected_at: model.detected_at,
        resolved_at: model.resolved_at,
    })
}

fn anomaly_to_active(anomaly: Anomaly) -> anomaly::ActiveModel {
    anomaly::ActiveModel {
        id: Set(anomaly.id),
        store_id: Set(anomaly.store_id),
        sku_id: Set(anomaly.sku_id),
        anomaly_type: Set(anomaly.anomaly_type.to_string()),
        severity: Set(anomaly.severity.to_string()),
        description: Set(anomaly.description),
        status: Set(anomaly.status.to_string()),
        detected_at: Set(anomaly.detected_at),
        resolved_at: Set(anomaly.resolved_at),
    }
}

#[async_trait]
impl ForecastStore for SeaOrmStore {
    async fn find_store(&self, store_id: Uuid) -> Result<Option<Store>, ServiceError> {
        let found = store::Entity::find_by_id(store_id)
            .one(self.db.as_ref())
            .await?;
        Ok(found.map(|m| Store {
            id: m.id,
            organization_id: m.organization_id,
            name: m.name,
        }))
    }

    async fn list_active_skus(&self, organization_id: Uuid) -> Result<Vec<Sku>, ServiceError> {
        sku::Entity::find()
            .filter(sku::Column::OrganizationId.eq(organization_id))
            .filter(sku::Column::Active.eq(true))
            .order_by_asc(sku::Column::Code)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(sku_from_model)
            .collect()
    }

    async fn find_sku(&self, sku_id: Uuid) -> Result<Option<Sku>, ServiceError> {
        sku::Entity::find_by_id(sku_id)
            .one(self.db.as_ref())
            .await?
            .map(sku_from_model)
            .transpose()
    }

    async fn list_sales(
        &self,
        store_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SalesRecord>, ServiceError> {
        let rows = sales_record::Entity::find()
            .filter(sales_record::Column::StoreId.eq(store_id))
            .filter(sales_record::Column::SoldAt.gte(from))
            .filter(sales_record::Column::SoldAt.lte(to))
            .order_by_asc(sales_record::Column::SoldAt)
            .all(self.db.as_ref())
            .await?;
        Ok(rows
            .into_iter()
            .map(|m| SalesRecord {
                id: m.id,
                store_id: m.store_id,
                sku_id: m.sku_id,
                sold_at: m.sold_at,
                quantity: m.quantity,
                price: m.price,
                promo: m.promo,
            })
            .collect())
    }

    async fn list_inventory(&self, store_id: Uuid) -> Result<Vec<InventorySnapshot>, ServiceError> {
        let rows = inventory_snapshot::Entity::find()
            .filter(inventory_snapshot::Column::StoreId.eq(store_id))
            .order_by_asc(inventory_snapshot::Column::SkuId)
            .all(self.db.as_ref())
            .await?;
        Ok(rows
            .into_iter()
            .map(|m| InventorySnapshot {
                store_id: m.store_id,
                sku_id: m.sku_id,
                on_hand: m.on_hand,
                reserved: m.reserved,
                last_counted_at: m.last_counted_at,
            })
            .collect())
    }

    async fn find_forecast(
        &self,
        store_id: Uuid,
        sku_id: Uuid,
    ) -> Result<Option<Forecast>, ServiceError> {
        forecast::Entity::find()
            .filter(forecast::Column::StoreId.eq(store_id))
            .filter(forecast::Column::SkuId.eq(sku_id))
            .order_by_desc(forecast::Column::GeneratedAt)
            .one(self.db.as_ref())
            .await?
            .map(forecast_from_model)
            .transpose()
    }

    #[instrument(skip(self, forecast), fields(store_id = %forecast.store_id, sku_id = %forecast.sku_id))]
    async fn upsert_forecast(&self, forecast: Forecast) -> Result<(), ServiceError> {
        let model = forecast::ActiveModel {
            id: Set(forecast.id),
            store_id: Set(forecast.store_id),
            sku_id: Set(forecast.sku_id),
            horizon_hours: Set(to_i32(forecast.horizon_hours, "horizon_hours")?),
            generated_at: Set(forecast.generated_at),
            median: Set(serde_json::to_value(&forecast.median)?),
            p10: Set(serde_json::to_value(&forecast.p10)?),
            p90: Set(serde_json::to_value(&forecast.p90)?),
            metadata: Set(serde_json::to_value(&forecast.metadata)?),
        };

        let txn = self.db.begin().await?;
        let removed = forecast::Entity::delete_many()
            .filter(forecast::Column::StoreId.eq(forecast.store_id))
            .filter(forecast::Column::SkuId.eq(forecast.sku_id))
            .exec(&txn)
            .await?;
        forecast::Entity::insert(model)
            .exec_without_returning(&txn)
            .await?;
        txn.commit().await?;

        debug!(replaced = removed.rows_affected, "Forecast stored");
        Ok(())
    }

    async fn insert_reorder_suggestion(
        &self,
        suggestion: ReorderSuggestion,
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        let model = reorder_suggestion::ActiveModel {
            id: Set(suggestion.id),
            store_id: Set(suggestion.store_id),
            sku_id: Set(suggestion.sku_id),
            suggested_qty: Set(suggestion.suggested_qty),
            safety_stock: Set(suggestion.safety_stock),
            lead_time_days: Set(to_i32(suggestion.lead_time_days, "lead_time_days")?),
            rationale: Set(serde_json::to_value(&suggestion.rationale)?),
            status: Set(suggestion.status.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        reorder_suggestion::Entity::insert(model)
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn find_reorder_suggestion(
        &self,
        id: Uuid,
    ) -> Result<Option<ReorderSuggestion>, ServiceError> {
        reorder_suggestion::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(suggestion_from_model)
            .transpose()
    }

    async fn find_pending_reorder_suggestion(
        &self,
        store_id: Uuid,
        sku_id: Uuid,
    ) -> Result<Option<ReorderSuggestion>, ServiceError> {
        reorder_suggestion::Entity::find()
            .filter(reorder_suggestion::Column::StoreId.eq(store_id))
            .filter(reorder_suggestion::Column::SkuId.eq(sku_id))
            .filter(reorder_suggestion::Column::Status.eq(ReorderStatus::Pending.to_string()))
            .order_by_asc(reorder_suggestion::Column::CreatedAt)
            .one(self.db.as_ref())
            .await?
            .map(suggestion_from_model)
            .transpose()
    }

    async fn update_reorder_status(
        &self,
        id: Uuid,
        status: ReorderStatus,
    ) -> Result<(), ServiceError> {
        let result = reorder_suggestion::Entity::update_many()
            .col_expr(
                reorder_suggestion::Column::Status,
                Expr::value(status.to_string()),
            )
            .col_expr(reorder_suggestion::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(reorder_suggestion::Column::Id.eq(id))
            .filter(reorder_suggestion::Column::Status.eq(ReorderStatus::Pending.to_string()))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return match reorder_suggestion::Entity::find_by_id(id)
                .one(self.db.as_ref())
                .await?
            {
                Some(existing) => Err(ServiceError::not_pending(
                    "Reorder suggestion",
                    id,
                    existing.status,
                )),
                None => Err(ServiceError::suggestion_not_found(id)),
            };
        }
        Ok(())
    }

    async fn insert_anomalies(&self, anomalies: Vec<Anomaly>) -> Result<(), ServiceError> {
        if anomalies.is_empty() {
            return Ok(());
        }
        let count = anomalies.len();
        anomaly::Entity::insert_many(anomalies.into_iter().map(anomaly_to_active))
            .on_conflict(
                OnConflict::column(anomaly::Column::Id)
                    .update_columns([
                        anomaly::Column::Severity,
                        anomaly::Column::Description,
                        anomaly::Column::DetectedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        debug!(count, "Anomalies upserted");
        Ok(())
    }

    async fn find_anomaly(&self, id: Uuid) -> Result<Option<Anomaly>, ServiceError> {
        anomaly::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(anomaly_from_model)
            .transpose()
    }

    async fn update_anomaly_status(
        &self,
        id: Uuid,
        status: AnomalyStatus,
        resolved_at: Option<DateTime<Utc>>,
    ) -> Result<(), ServiceError> {
        let result = anomaly::Entity::update_many()
            .col_expr(anomaly::Column::Status, Expr::value(status.to_string()))
            .col_expr(anomaly::Column::ResolvedAt, Expr::value(resolved_at))
            .filter(anomaly::Column::Id.eq(id))
            .filter(anomaly::Column::Status.eq(AnomalyStatus::Pending.to_string()))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return match anomaly::Entity::find_by_id(id).one(self.db.as_ref()).await? {
                Some(existing) => Err(ServiceError::not_pending("Anomaly", id, existing.status)),
                None => Err(ServiceError::anomaly_not_found(id)),
            };
        }
        Ok(())
    }
}
