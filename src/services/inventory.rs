use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::with_transaction,
    entities::{
        batch_inventory,
        export_inventory::{self, MovementType},
        order_detail, product,
        product_serial::{self, SerialStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Sellable units below which a product is reported as running low.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// Input for receiving a new lot into stock
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiveBatchInput {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub batch_number: String,
    #[validate(length(min = 1, max = 64))]
    pub lot_number: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[serde(default)]
    pub unit_cost: Decimal,
    pub manufacturing_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    /// Present only for serial-tracked goods; one entry per unit.
    #[serde(default)]
    pub serial_numbers: Vec<String>,
    pub notes: Option<String>,
}

/// A non-sale stock movement against one lot
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExportStockInput {
    pub batch_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub movement_type: MovementType,
    #[serde(default)]
    pub serial_numbers: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotStock {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub lot_number: String,
    pub received: i32,
    pub exported: i32,
    pub remaining: i32,
    pub is_serialized: bool,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSummary {
    pub product_id: Uuid,
    pub stock_quantity: i32,
    pub total_remaining: i32,
    pub lots: Vec<LotStock>,
}

/// Lot, serial and stock-counter bookkeeping.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(product_id = %input.product_id, lot = %input.lot_number))]
    pub async fn receive_batch(
        &self,
        input: ReceiveBatchInput,
    ) -> Result<batch_inventory::Model, ServiceError> {
        input.validate()?;

        if let (Some(made), Some(expires)) = (input.manufacturing_date, input.expiry_date) {
            if expires < made {
                return Err(ServiceError::ValidationError(
                    "expiry_date must not precede manufacturing_date".to_string(),
                ));
            }
        }
        if input.unit_cost.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "unit_cost must not be negative".to_string(),
            ));
        }

        let serialized = !input.serial_numbers.is_empty();
        if serialized {
            if input.serial_numbers.len() != input.quantity as usize {
                return Err(ServiceError::ValidationError(format!(
                    "expected {} serial numbers, got {}",
                    input.quantity,
                    input.serial_numbers.len()
                )));
            }
            let mut seen = HashSet::new();
            for serial in &input.serial_numbers {
                if serial.trim().is_empty() {
                    return Err(ServiceError::ValidationError(
                        "serial numbers must not be blank".to_string(),
                    ));
                }
                if !seen.insert(serial.as_str()) {
                    return Err(ServiceError::ValidationError(format!(
                        "duplicate serial number {}",
                        serial
                    )));
                }
            }
        }

        let batch = with_transaction(&self.db_pool, |txn| {
            Box::pin(async move {
                let product = product::Entity::find_by_id(input.product_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", input.product_id))
                    })?;

                let lot_taken = batch_inventory::Entity::find()
                    .filter(batch_inventory::Column::LotNumber.eq(input.lot_number.clone()))
                    .one(txn)
                    .await?
                    .is_some();
                if lot_taken {
                    return Err(ServiceError::Conflict(format!(
                        "lot number {} already exists",
                        input.lot_number
                    )));
                }

                if serialized {
                    let existing = product_serial::Entity::find()
                        .filter(
                            product_serial::Column::SerialNumber
                                .is_in(input.serial_numbers.iter().cloned()),
                        )
                        .one(txn)
                        .await?;
                    if let Some(existing) = existing {
                        return Err(ServiceError::Conflict(format!(
                            "serial number {} already exists",
                            existing.serial_number
                        )));
                    }
                }

                let now = Utc::now();
                let batch = batch_inventory::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(product.id),
                    vendor_id: Set(product.vendor_id),
                    batch_number: Set(input.batch_number.clone()),
                    lot_number: Set(input.lot_number.clone()),
                    quantity: Set(input.quantity),
                    unit_cost: Set(input.unit_cost),
                    is_serialized: Set(serialized),
                    manufacturing_date: Set(input.manufacturing_date),
                    expiry_date: Set(input.expiry_date),
                    notes: Set(input.notes.clone()),
                    created_at: Set(now),
                }
                .insert(txn)
                .await?;

                for serial in &input.serial_numbers {
                    product_serial::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        batch_inventory_id: Set(batch.id),
                        product_id: Set(product.id),
                        serial_number: Set(serial.clone()),
                        status: Set(SerialStatus::Stock),
                        created_at: Set(now),
                        updated_at: Set(None),
                    }
                    .insert(txn)
                    .await?;
                }

                product::Entity::update_many()
                    .col_expr(
                        product::Column::StockQuantity,
                        Expr::col(product::Column::StockQuantity).add(input.quantity),
                    )
                    .col_expr(product::Column::UpdatedAt, Expr::value(Some(now)))
                    .filter(product::Column::Id.eq(product.id))
                    .exec(txn)
                    .await?;

                Ok(batch)
            })
        })
        .await?;

        info!(batch_id = %batch.id, quantity = batch.quantity, "batch received");
        self.event_sender
            .send_or_log(Event::BatchReceived {
                batch_id: batch.id,
                product_id: batch.product_id,
                quantity: batch.quantity,
            })
            .await;

        Ok(batch)
    }

    /// Units still available in one lot.
    pub async fn lot_remaining(&self, batch_id: Uuid) -> Result<i32, ServiceError> {
        let batch = batch_inventory::Entity::find_by_id(batch_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Batch {} not found", batch_id)))?;
        let exported = exported_quantity(&*self.db_pool, batch_id).await?;
        Ok(batch.quantity - exported)
    }

    #[instrument(skip(self))]
    pub async fn stock_summary(&self, product_id: Uuid) -> Result<StockSummary, ServiceError> {
        let db = &*self.db_pool;
        let product = product::Entity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let mut lots = batch_inventory::Entity::find()
            .filter(batch_inventory::Column::ProductId.eq(product_id))
            .order_by_asc(batch_inventory::Column::CreatedAt)
            .all(db)
            .await?;
        sort_fifo(&mut lots);

        let mut out = Vec::with_capacity(lots.len());
        for lot in lots {
            let exported = exported_quantity(db, lot.id).await?;
            out.push(LotStock {
                batch_id: lot.id,
                batch_number: lot.batch_number,
                lot_number: lot.lot_number,
                received: lot.quantity,
                exported,
                remaining: lot.quantity - exported,
                is_serialized: lot.is_serialized,
                expiry_date: lot.expiry_date,
            });
        }

        Ok(StockSummary {
            product_id,
            stock_quantity: product.stock_quantity,
            total_remaining: out.iter().map(|l| l.remaining).sum(),
            lots: out,
        })
    }

    /// Takes `detail.quantity` units of the line's product out of stock, oldest
    /// expiring lots first. Runs inside the caller's transaction.
    #[instrument(skip(txn, detail), fields(order_detail_id = %detail.id, product_id = %detail.product_id))]
    pub async fn allocate_for_order(
        txn: &DatabaseTransaction,
        detail: &order_detail::Model,
    ) -> Result<Vec<export_inventory::Model>, ServiceError> {
        decrement_stock(txn, detail.product_id, detail.quantity).await?;

        let mut lots = batch_inventory::Entity::find()
            .filter(batch_inventory::Column::ProductId.eq(detail.product_id))
            .order_by_asc(batch_inventory::Column::CreatedAt)
            .lock_exclusive()
            .all(txn)
            .await?;
        sort_fifo(&mut lots);

        let mut needed = detail.quantity;
        let mut exports = Vec::new();

        for lot in lots {
            if needed == 0 {
                break;
            }
            let remaining = lot.quantity - exported_quantity(txn, lot.id).await?;
            if remaining <= 0 {
                continue;
            }
            let take = remaining.min(needed);

            if lot.is_serialized {
                let serials = product_serial::Entity::find()
                    .filter(product_serial::Column::BatchInventoryId.eq(lot.id))
                    .filter(product_serial::Column::Status.eq(SerialStatus::Stock))
                    .order_by_asc(product_serial::Column::SerialNumber)
                    .limit(take as u64)
                    .all(txn)
                    .await?;
                for serial in serials {
                    mark_serial(txn, serial.id, SerialStatus::Sold).await?;
                    exports.push(
                        insert_export(
                            txn,
                            &lot,
                            Some(serial.id),
                            Some(detail.id),
                            1,
                            MovementType::Sale,
                            None,
                        )
                        .await?,
                    );
                    needed -= 1;
                }
            } else {
                exports.push(
                    insert_export(
                        txn,
                        &lot,
                        None,
                        Some(detail.id),
                        take,
                        MovementType::Sale,
                        None,
                    )
                    .await?,
                );
                needed -= take;
            }
        }

        if needed > 0 {
            warn!(short_by = needed, "lots cannot cover the stock counter");
            return Err(ServiceError::InsufficientStock(format!(
                "product {} lots are short by {} units",
                detail.product_id, needed
            )));
        }

        Ok(exports)
    }

    /// Undoes the sale exports of the given order lines: deletes the export
    /// rows, returns serials to stock and restores the product counters.
    pub async fn release_order_allocation(
        txn: &DatabaseTransaction,
        order_detail_ids: &[Uuid],
    ) -> Result<u64, ServiceError> {
        if order_detail_ids.is_empty() {
            return Ok(0);
        }

        let exports = export_inventory::Entity::find()
            .filter(export_inventory::Column::OrderDetailId.is_in(order_detail_ids.iter().copied()))
            .filter(export_inventory::Column::MovementType.eq(MovementType::Sale))
            .all(txn)
            .await?;

        let mut restock: HashMap<Uuid, i32> = HashMap::new();
        for export in &exports {
            if let Some(serial_id) = export.product_serial_id {
                mark_serial(txn, serial_id, SerialStatus::Stock).await?;
            }
            *restock.entry(export.product_id).or_default() += export.quantity;
        }

        let deleted = export_inventory::Entity::delete_many()
            .filter(export_inventory::Column::Id.is_in(exports.iter().map(|e| e.id)))
            .exec(txn)
            .await?
            .rows_affected;

        let now = Utc::now();
        for (product_id, quantity) in restock {
            product::Entity::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).add(quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(Some(now)))
                .filter(product::Column::Id.eq(product_id))
                .exec(txn)
                .await?;
        }

        Ok(deleted)
    }

    /// Records damage, loss, adjustment or a return to the vendor against a lot.
    #[instrument(skip(self, input), fields(batch_id = %input.batch_id, movement = %input.movement_type))]
    pub async fn export_stock(
        &self,
        input: ExportStockInput,
    ) -> Result<Vec<export_inventory::Model>, ServiceError> {
        input.validate()?;
        if input.movement_type == MovementType::Sale {
            return Err(ServiceError::ValidationError(
                "sales leave stock through order confirmation".to_string(),
            ));
        }

        let batch_id = input.batch_id;
        let movement_type = input.movement_type;
        let quantity = input.quantity;
        let (exports, product_id, stock_left) = with_transaction(&self.db_pool, |txn| {
            Box::pin(async move {
                let lot = batch_inventory::Entity::find_by_id(input.batch_id)
                    .lock_exclusive()
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Batch {} not found", input.batch_id))
                    })?;

                let remaining = lot.quantity - exported_quantity(txn, lot.id).await?;
                if input.quantity > remaining {
                    return Err(ServiceError::InsufficientStock(format!(
                        "lot {} has {} units left, {} requested",
                        lot.lot_number, remaining, input.quantity
                    )));
                }

                let mut exports = Vec::new();
                if lot.is_serialized {
                    if input.serial_numbers.len() != input.quantity as usize {
                        return Err(ServiceError::ValidationError(format!(
                            "serialized lot needs {} serial numbers, got {}",
                            input.quantity,
                            input.serial_numbers.len()
                        )));
                    }
                    let unique: HashSet<&String> = input.serial_numbers.iter().collect();
                    if unique.len() != input.serial_numbers.len() {
                        return Err(ServiceError::ValidationError(
                            "duplicate serial numbers in request".to_string(),
                        ));
                    }

                    let serials = product_serial::Entity::find()
                        .filter(product_serial::Column::BatchInventoryId.eq(lot.id))
                        .filter(
                            product_serial::Column::SerialNumber
                                .is_in(input.serial_numbers.iter().cloned()),
                        )
                        .all(txn)
                        .await?;
                    if serials.len() != input.serial_numbers.len() {
                        return Err(ServiceError::ValidationError(format!(
                            "some serial numbers do not belong to lot {}",
                            lot.lot_number
                        )));
                    }
                    for serial in serials {
                        if serial.status != SerialStatus::Stock {
                            return Err(ServiceError::InvalidOperation(format!(
                                "serial {} is not in stock",
                                serial.serial_number
                            )));
                        }
                        mark_serial(txn, serial.id, SerialStatus::Adjustment).await?;
                        exports.push(
                            insert_export(
                                txn,
                                &lot,
                                Some(serial.id),
                                None,
                                1,
                                input.movement_type,
                                input.notes.clone(),
                            )
                            .await?,
                        );
                    }
                } else {
                    if !input.serial_numbers.is_empty() {
                        return Err(ServiceError::ValidationError(
                            "lot is not serial-tracked".to_string(),
                        ));
                    }
                    exports.push(
                        insert_export(
                            txn,
                            &lot,
                            None,
                            None,
                            input.quantity,
                            input.movement_type,
                            input.notes.clone(),
                        )
                        .await?,
                    );
                }

                decrement_stock(txn, lot.product_id, input.quantity).await?;
                let stock_left = product::Entity::find_by_id(lot.product_id)
                    .one(txn)
                    .await?
                    .map(|p| p.stock_quantity)
                    .unwrap_or_default();

                Ok((exports, lot.product_id, stock_left))
            })
        })
        .await?;

        counter!("verdant_stock_exports_total", 1, "movement" => movement_type.to_string());
        self.event_sender
            .send_or_log(Event::StockExported {
                batch_id,
                product_id,
                quantity,
                movement_type: movement_type.to_string(),
            })
            .await;
        if stock_left < LOW_STOCK_THRESHOLD {
            self.event_sender
                .send_or_log(Event::LowStock {
                    product_id,
                    remaining: stock_left,
                })
                .await;
        }

        Ok(exports)
    }
}

/// Raises `LowStock` for each of `product_ids` now under the threshold.
/// Call after the draining write has committed.
pub(crate) async fn report_low_stock<C: ConnectionTrait>(
    conn: &C,
    events: &EventSender,
    product_ids: &[Uuid],
) -> Result<(), ServiceError> {
    if product_ids.is_empty() {
        return Ok(());
    }
    let low = product::Entity::find()
        .filter(product::Column::Id.is_in(product_ids.iter().copied()))
        .filter(product::Column::StockQuantity.lt(LOW_STOCK_THRESHOLD))
        .all(conn)
        .await?;
    for item in low {
        events
            .send_or_log(Event::LowStock {
                product_id: item.id,
                remaining: item.stock_quantity,
            })
            .await;
    }
    Ok(())
}

/// Conditional decrement of the sellable counter; fails instead of going negative.
async fn decrement_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::StockQuantity,
            Expr::col(product::Column::StockQuantity).sub(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Some(Utc::now())))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::StockQuantity.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        counter!("verdant_stock_conflicts_total", 1);
        return Err(ServiceError::InsufficientStock(format!(
            "product {} does not have {} units in stock",
            product_id, quantity
        )));
    }
    Ok(())
}

async fn exported_quantity<C: ConnectionTrait>(conn: &C, batch_id: Uuid) -> Result<i32, ServiceError> {
    let quantities: Vec<i32> = export_inventory::Entity::find()
        .select_only()
        .column(export_inventory::Column::Quantity)
        .filter(export_inventory::Column::BatchInventoryId.eq(batch_id))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(quantities.into_iter().sum())
}

async fn mark_serial<C: ConnectionTrait>(
    conn: &C,
    serial_id: Uuid,
    status: SerialStatus,
) -> Result<(), ServiceError> {
    let expected = match status {
        SerialStatus::Stock => vec![SerialStatus::Sold, SerialStatus::Adjustment],
        SerialStatus::Sold | SerialStatus::Adjustment => vec![SerialStatus::Stock],
    };
    let result = product_serial::Entity::update_many()
        .col_expr(product_serial::Column::Status, Expr::value(status))
        .col_expr(product_serial::Column::UpdatedAt, Expr::value(Some(Utc::now())))
        .filter(product_serial::Column::Id.eq(serial_id))
        .filter(product_serial::Column::Status.is_in(expected))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(serial_id));
    }
    Ok(())
}

async fn insert_export<C: ConnectionTrait>(
    conn: &C,
    lot: &batch_inventory::Model,
    serial_id: Option<Uuid>,
    order_detail_id: Option<Uuid>,
    quantity: i32,
    movement_type: MovementType,
    notes: Option<String>,
) -> Result<export_inventory::Model, ServiceError> {
    let export = export_inventory::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(lot.product_id),
        batch_inventory_id: Set(lot.id),
        product_serial_id: Set(serial_id),
        order_detail_id: Set(order_detail_id),
        quantity: Set(quantity),
        movement_type: Set(movement_type),
        notes: Set(notes),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(export)
}

/// Earliest expiry first, undated lots last, then by receipt order.
fn sort_fifo(lots: &mut [batch_inventory::Model]) {
    lots.sort_by(|a, b| {
        (a.expiry_date.is_none(), a.expiry_date, a.created_at).cmp(&(
            b.expiry_date.is_none(),
            b.expiry_date,
            b.created_at,
        ))
    });
}
