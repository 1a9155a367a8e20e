use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog item sold by a single vendor.
///
/// `stock_quantity` is the sellable total across all lots. It is only ever
/// moved together with a lot receipt or an export so it stays in step with
/// `batch_inventories`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub vendor_id: Uuid,
    #[sea_orm(unique)]
    pub product_code: String,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub discount_percentage: Decimal,
    pub stock_quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    pub weight_kg: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub length_cm: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub width_cm: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub height_cm: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::batch_inventory::Entity")]
    Batches,
}

impl Related<super::batch_inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
