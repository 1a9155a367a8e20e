use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A received lot. `quantity` is what arrived and never changes; what is
/// left is `quantity` minus the lot's export rows.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batch_inventories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub batch_number: String,
    #[sea_orm(unique)]
    pub lot_number: String,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub unit_cost: Decimal,
    pub is_serialized: bool,
    pub manufacturing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::product_serial::Entity")]
    Serials,
    #[sea_orm(has_many = "super::export_inventory::Entity")]
    Exports,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::product_serial::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Serials.def()
    }
}

impl Related<super::export_inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Exports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
