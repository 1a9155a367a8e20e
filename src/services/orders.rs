use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    cache::{PreviewStore, StoredPreview},
    db::with_transaction,
    entities::{
        order::{self, OrderStatus, PaymentMethod},
        order_detail,
        payment::{self, PaymentStatus},
        product,
        transaction::{self, TransactionStatus, TransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        couriers::{AddressCodes, RateRequest, ShippingQuote},
        inventory::{report_low_stock, InventoryService},
        packaging::{self, PackageBox, PackageDimensions, PackageItem},
        shipping::RateShoppingService,
        wallet::{set_transaction_status, WalletService, CURRENCY},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 255))]
    pub recipient_name: String,
    #[validate(length(min = 8, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 500))]
    pub street: String,
    pub province_id: i64,
    pub district_id: i64,
    #[validate(length(min = 1, max = 20))]
    pub ward_code: String,
}

impl ShippingAddress {
    pub fn codes(&self) -> AddressCodes {
        AddressCodes {
            province_id: self.province_id,
            district_id: self.district_id,
            ward_code: self.ward_code.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PreviewOrderRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub items: Vec<PreviewItem>,
    #[validate]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmOrderRequest {
    pub preview_id: Uuid,
    pub customer_id: Uuid,
    #[validate(length(min = 1))]
    pub quote_id: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Priced snapshot of one line at preview time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewLine {
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub subtotal: Decimal,
}

/// Checkout quote held in the cache until the customer confirms it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPreview {
    pub preview_id: Uuid,
    pub customer_id: Uuid,
    pub lines: Vec<PreviewLine>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_before_shipping: Decimal,
    pub package: PackageDimensions,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub cod_amount: Decimal,
    pub notes: Option<String>,
    pub quotes: Vec<ShippingQuote>,
    pub expires_at: DateTime<Utc>,
}

impl OrderPreview {
    pub fn quote(&self, quote_id: &str) -> Option<&ShippingQuote> {
        self.quotes.iter().find(|q| q.quote_id == quote_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub details: Vec<order_detail::Model>,
    pub payment: Option<payment::Model>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub subtotal: Decimal,
    pub discount: Decimal,
}

/// `unit_price × quantity` and the percentage discount rounded to whole VND.
pub fn price_line(unit_price: Decimal, quantity: i32, discount_percentage: Decimal) -> LineAmounts {
    let subtotal = unit_price * Decimal::from(quantity);
    let discount = (subtotal * discount_percentage / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    LineAmounts { subtotal, discount }
}

/// VAT already contained in a tax-inclusive amount.
pub fn included_tax(net: Decimal, rate: Decimal) -> Decimal {
    (net * rate / (Decimal::ONE + rate)).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Checks `total = Σ subtotal + shipping − discount` and `discount = Σ line discounts`.
pub fn verify_totals(
    order: &order::Model,
    details: &[order_detail::Model],
) -> Result<(), ServiceError> {
    let subtotal: Decimal = details.iter().map(|d| d.subtotal).sum();
    let discount: Decimal = details.iter().map(|d| d.discount_amount).sum();

    if order.subtotal != subtotal
        || order.discount_amount != discount
        || order.total_amount != subtotal + order.shipping_fee - discount
    {
        error!(order_id = %order.id, "order totals do not reconcile");
        return Err(ServiceError::InternalError(format!(
            "order {} totals do not reconcile",
            order.id
        )));
    }
    Ok(())
}

/// Allowed status moves. COD orders ship and deliver without a prior `paid`.
pub fn can_transition(from: OrderStatus, to: OrderStatus, method: PaymentMethod) -> bool {
    use OrderStatus::*;
    match (from, to) {
        (Pending, Paid) => method == PaymentMethod::PayOs,
        (Pending, Shipped) => method == PaymentMethod::Cod,
        (Pending, Delivered) => method == PaymentMethod::Cod,
        (Paid, Shipped) | (Paid, Delivered) | (Shipped, Delivered) => true,
        (Pending, Cancelled) => true,
        _ => false,
    }
}

/// Preview, confirmation and lifecycle of customer orders.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    previews: PreviewStore,
    rates: Arc<RateShoppingService>,
    wallets: WalletService,
    origin: AddressCodes,
    tax_rate: Decimal,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        event_sender: EventSender,
        previews: PreviewStore,
        rates: Arc<RateShoppingService>,
        wallets: WalletService,
        origin: AddressCodes,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            previews,
            rates,
            wallets,
            origin,
            tax_rate,
        }
    }

    /// Prices the cart, sizes the parcel, collects courier quotes and caches
    /// the result for confirmation.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, items = request.items.len()))]
    pub async fn preview_order(&self, request: PreviewOrderRequest) -> Result<OrderPreview, ServiceError> {
        request.validate()?;

        let mut seen = HashSet::new();
        for item in &request.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "quantity for product {} must be at least 1",
                    item.product_id
                )));
            }
            if !seen.insert(item.product_id) {
                return Err(ServiceError::ValidationError(format!(
                    "product {} appears more than once",
                    item.product_id
                )));
            }
        }

        let products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(request.items.iter().map(|i| i.product_id)))
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut lines = Vec::with_capacity(request.items.len());
        let mut package_items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = products
                .get(&item.product_id)
                .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", item.product_id)))?;
            if !product.is_active {
                return Err(ServiceError::ValidationError(format!(
                    "product {} is not for sale",
                    product.product_code
                )));
            }
            if product.stock_quantity < item.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "product {} has {} in stock, {} requested",
                    product.product_code, product.stock_quantity, item.quantity
                )));
            }

            let amounts = price_line(product.unit_price, item.quantity, product.discount_percentage);
            lines.push(PreviewLine {
                product_id: product.id,
                vendor_id: product.vendor_id,
                product_name: product.name.clone(),
                quantity: item.quantity,
                unit_price: product.unit_price,
                discount_amount: amounts.discount,
                subtotal: amounts.subtotal,
            });
            package_items.push(PackageItem {
                dimensions: PackageBox::new(product.length_cm, product.width_cm, product.height_cm),
                weight_kg: product.weight_kg,
                quantity: item.quantity as u32,
            });
        }

        let subtotal: Decimal = lines.iter().map(|l| l.subtotal).sum();
        let discount: Decimal = lines.iter().map(|l| l.discount_amount).sum();
        let total_before_shipping = subtotal - discount;
        let package = packaging::combine(&package_items)?;
        let cod_amount = match request.payment_method {
            PaymentMethod::Cod => total_before_shipping,
            PaymentMethod::PayOs => Decimal::ZERO,
        };

        let quotes = self
            .rates
            .shop(&RateRequest {
                origin: self.origin.clone(),
                destination: request.shipping_address.codes(),
                package,
                cod_amount,
                insurance_value: total_before_shipping,
            })
            .await?;

        let ttl = ChronoDuration::from_std(self.previews.ttl())
            .map_err(|e| ServiceError::InternalError(format!("invalid preview TTL: {}", e)))?;
        let mut preview = OrderPreview {
            preview_id: Uuid::new_v4(),
            customer_id: request.customer_id,
            lines,
            subtotal,
            discount_amount: discount,
            tax_amount: included_tax(total_before_shipping, self.tax_rate),
            total_before_shipping,
            package,
            shipping_address: request.shipping_address,
            payment_method: request.payment_method,
            cod_amount,
            notes: request.notes,
            quotes,
            expires_at: Utc::now() + ttl,
        };
        preview.expires_at = self.previews.save(preview.preview_id, &preview).await?;

        counter!("verdant_order_previews_total", 1);
        info!(preview_id = %preview.preview_id, quotes = preview.quotes.len(), "order previewed");
        self.event_sender
            .send_or_log(Event::OrderPreviewed {
                preview_id: preview.preview_id,
                customer_id: preview.customer_id,
                quote_count: preview.quotes.len(),
            })
            .await;

        Ok(preview)
    }

    /// Turns a cached preview into an order. A preview is consumed at most once.
    #[instrument(skip(self, request), fields(preview_id = %request.preview_id))]
    pub async fn confirm_order(&self, request: ConfirmOrderRequest) -> Result<OrderWithDetails, ServiceError> {
        request.validate()?;

        let stored: StoredPreview<OrderPreview> = self
            .previews
            .load(request.preview_id)
            .await?
            .ok_or_else(|| not_found_preview(request.preview_id))?;
        if stored.payload.customer_id != request.customer_id {
            return Err(ServiceError::Forbidden(
                "preview belongs to another customer".to_string(),
            ));
        }
        if stored.payload.quote(&request.quote_id).is_none() {
            return Err(ServiceError::ValidationError(format!(
                "quote {} is not part of this preview",
                request.quote_id
            )));
        }

        let stored: StoredPreview<OrderPreview> = self
            .previews
            .consume(request.preview_id)
            .await?
            .ok_or_else(|| not_found_preview(request.preview_id))?;

        let preview = stored.payload.clone();
        let quote_id = request.quote_id.clone();
        let notes = request.notes.clone().or_else(|| preview.notes.clone());

        let result = with_transaction(&self.db_pool, |txn| {
            Box::pin(async move { insert_order(txn, &preview, &quote_id, notes).await })
        })
        .await;

        match result {
            Ok(created) => {
                counter!("verdant_orders_confirmed_total", 1);
                info!(order_id = %created.order.id, total = %created.order.total_amount, "order confirmed");
                self.event_sender
                    .send_or_log(Event::OrderCreated(created.order.id))
                    .await;
                let product_ids: Vec<Uuid> = created.details.iter().map(|d| d.product_id).collect();
                if let Err(e) =
                    report_low_stock(&*self.db_pool, &self.event_sender, &product_ids).await
                {
                    warn!(error = %e, "could not check stock levels after confirmation");
                }
                Ok(created)
            }
            Err(e) => {
                counter!("verdant_order_confirm_failures_total", 1);
                match self.previews.restore(request.preview_id, &stored).await {
                    Ok(true) => info!("preview restored after failed confirmation"),
                    Ok(false) => info!("preview expired during confirmation"),
                    Err(restore_err) => warn!(error = %restore_err, "could not restore preview"),
                }
                Err(e)
            }
        }
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderWithDetails, ServiceError> {
        let db = &*self.db_pool;
        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| order_not_found(order_id))?;
        let details = order_detail::Entity::find()
            .filter(order_detail::Column::OrderId.eq(order_id))
            .order_by_asc(order_detail::Column::CreatedAt)
            .all(db)
            .await?;
        let payment = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .one(db)
            .await?;
        Ok(OrderWithDetails {
            order,
            details,
            payment,
        })
    }

    #[instrument(skip(self))]
    pub async fn mark_shipped(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let (updated, old_status) = with_transaction(&self.db_pool, |txn| {
            Box::pin(async move {
                let order = locked_order(txn, order_id).await?;
                let old_status = order.status;
                ensure_transition(&order, OrderStatus::Shipped)?;

                let now = Utc::now();
                let mut active = order.into_active_model();
                active.status = Set(OrderStatus::Shipped);
                active.shipped_at = Set(Some(now));
                active.updated_at = Set(Some(now));
                Ok((active.update(txn).await?, old_status))
            })
        })
        .await?;

        self.announce_status(order_id, old_status, updated.status).await;
        Ok(updated)
    }

    /// Completes delivery; collects COD cash and pays the vendors their share.
    #[instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let wallets = self.wallets.clone();
        let (updated, old_status, credits) = with_transaction(&self.db_pool, |txn| {
            Box::pin(async move {
                let order = locked_order(txn, order_id).await?;
                let old_status = order.status;
                ensure_transition(&order, OrderStatus::Delivered)?;

                let now = Utc::now();
                if order.payment_method == PaymentMethod::Cod {
                    collect_cod(txn, &order).await?;
                }

                let details = order_detail::Entity::find()
                    .filter(order_detail::Column::OrderId.eq(order_id))
                    .all(txn)
                    .await?;

                let mut active = order.into_active_model();
                active.status = Set(OrderStatus::Delivered);
                active.delivered_at = Set(Some(now));
                active.updated_at = Set(Some(now));
                let updated = active.update(txn).await?;

                let credits = wallets.credit_vendors_for_order(txn, &updated, &details).await?;
                Ok((updated, old_status, credits))
            })
        })
        .await?;

        self.announce_status(order_id, old_status, updated.status).await;
        self.wallets.announce_credits(order_id, &credits).await;
        Ok(updated)
    }

    /// Cancels a pending order and puts its units back on the shelf.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let updated = with_transaction(&self.db_pool, |txn| {
            Box::pin(async move {
                let order = locked_order(txn, order_id).await?;
                ensure_transition(&order, OrderStatus::Cancelled)?;

                let detail_ids: Vec<Uuid> = order_detail::Entity::find()
                    .select_only()
                    .column(order_detail::Column::Id)
                    .filter(order_detail::Column::OrderId.eq(order_id))
                    .into_tuple()
                    .all(txn)
                    .await?;
                let released = InventoryService::release_order_allocation(txn, &detail_ids).await?;
                info!(released, "sale exports released");

                if let Some(payment) = payment::Entity::find()
                    .filter(payment::Column::OrderId.eq(order_id))
                    .one(txn)
                    .await?
                {
                    if payment.status == PaymentStatus::Pending {
                        let mut active = payment.into_active_model();
                        active.status = Set(PaymentStatus::Cancelled);
                        active.updated_at = Set(Some(Utc::now()));
                        active.update(txn).await?;
                    }
                }
                let pending_in: Vec<Uuid> = transaction::Entity::find()
                    .select_only()
                    .column(transaction::Column::Id)
                    .filter(transaction::Column::OrderId.eq(order_id))
                    .filter(transaction::Column::TransactionType.eq(TransactionType::PaymentIn))
                    .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
                    .into_tuple()
                    .all(txn)
                    .await?;
                for id in pending_in {
                    set_transaction_status(txn, id, TransactionStatus::Cancelled).await?;
                }

                let now = Utc::now();
                let mut active = order.into_active_model();
                active.status = Set(OrderStatus::Cancelled);
                active.cancelled_at = Set(Some(now));
                active.updated_at = Set(Some(now));
                Ok(active.update(txn).await?)
            })
        })
        .await?;

        self.announce_status(order_id, OrderStatus::Pending, updated.status).await;
        self.event_sender.send_or_log(Event::OrderCancelled(order_id)).await;
        Ok(updated)
    }

    async fn announce_status(&self, order_id: Uuid, old: OrderStatus, new: OrderStatus) {
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old.to_string(),
                new_status: new.to_string(),
            })
            .await;
    }
}

fn not_found_preview(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Preview {} not found or expired", id))
}

fn order_not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Order {} not found", id))
}

fn ensure_transition(order: &order::Model, to: OrderStatus) -> Result<(), ServiceError> {
    if can_transition(order.status, to, order.payment_method) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "order {} cannot move from {} to {}",
            order.id, order.status, to
        )))
    }
}

async fn locked_order(txn: &DatabaseTransaction, order_id: Uuid) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| order_not_found(order_id))
}

async fn insert_order(
    txn: &DatabaseTransaction,
    preview: &OrderPreview,
    quote_id: &str,
    notes: Option<String>,
) -> Result<OrderWithDetails, ServiceError> {
    let quote = preview.quote(quote_id).ok_or_else(|| {
        ServiceError::ValidationError(format!("quote {} is not part of this preview", quote_id))
    })?;
    let units = preview.package.to_courier_units();
    let now = Utc::now();
    let order_id = Uuid::new_v4();

    let details: Vec<order_detail::Model> = preview
        .lines
        .iter()
        .map(|line| order_detail::Model {
            id: Uuid::new_v4(),
            order_id,
            product_id: line.product_id,
            vendor_id: line.vendor_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_amount: line.discount_amount,
            subtotal: line.subtotal,
            created_at: now,
        })
        .collect();

    let order = order::Model {
        id: order_id,
        customer_id: preview.customer_id,
        status: OrderStatus::Pending,
        subtotal: preview.subtotal,
        tax_amount: preview.tax_amount,
        shipping_fee: quote.total_fee,
        discount_amount: preview.discount_amount,
        total_amount: preview.subtotal + quote.total_fee - preview.discount_amount,
        payment_method: preview.payment_method,
        courier_provider: quote.provider.clone(),
        courier_service_id: quote.service_id.clone(),
        courier_service_name: quote.service_name.clone(),
        package_length_cm: units.length_cm as i32,
        package_width_cm: units.width_cm as i32,
        package_height_cm: units.height_cm as i32,
        package_weight_grams: units.weight_grams as i32,
        shipping_address: serde_json::to_value(&preview.shipping_address)?,
        notes,
        created_at: now,
        updated_at: None,
        shipped_at: None,
        delivered_at: None,
        cancelled_at: None,
    };
    verify_totals(&order, &details)?;

    let order = order.into_active_model().insert(txn).await?;
    let mut inserted = Vec::with_capacity(details.len());
    for detail in details {
        let detail = detail.into_active_model().insert(txn).await?;
        InventoryService::allocate_for_order(txn, &detail).await?;
        inserted.push(detail);
    }

    let payment = payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        payment_method: Set(order.payment_method),
        gateway: Set(order.payment_method.to_string()),
        gateway_order_code: Set(None),
        gateway_payment_id: Set(None),
        checkout_url: Set(None),
        amount: Set(order.total_amount),
        status: Set(PaymentStatus::Pending),
        gateway_response: Set(None),
        created_at: Set(now),
        updated_at: Set(None),
        paid_at: Set(None),
    }
    .insert(txn)
    .await?;

    if order.payment_method != PaymentMethod::Cod {
        insert_payment_in(txn, &order, TransactionStatus::Pending).await?;
    }

    Ok(OrderWithDetails {
        order,
        details: inserted,
        payment: Some(payment),
    })
}

async fn insert_payment_in(
    txn: &DatabaseTransaction,
    order: &order::Model,
    status: TransactionStatus,
) -> Result<transaction::Model, ServiceError> {
    let now = Utc::now();
    Ok(transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        transaction_type: Set(TransactionType::PaymentIn),
        user_id: Set(order.customer_id),
        order_id: Set(Some(order.id)),
        amount: Set(order.total_amount),
        currency: Set(CURRENCY.to_string()),
        status: Set(status),
        gateway_reference: Set(None),
        note: Set(Some(format!("{} payment", order.payment_method))),
        created_at: Set(now),
        completed_at: Set((status == TransactionStatus::Completed).then_some(now)),
    }
    .insert(txn)
    .await?)
}

/// Records the cash the courier collected on delivery.
async fn collect_cod(txn: &DatabaseTransaction, order: &order::Model) -> Result<(), ServiceError> {
    let payment = payment::Entity::find()
        .filter(payment::Column::OrderId.eq(order.id))
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Payment for order {} not found", order.id)))?;
    if payment.status == PaymentStatus::Completed {
        return Ok(());
    }

    let now = Utc::now();
    let mut active = payment.into_active_model();
    active.status = Set(PaymentStatus::Completed);
    active.paid_at = Set(Some(now));
    active.updated_at = Set(Some(now));
    active.update(txn).await?;

    insert_payment_in(txn, order, TransactionStatus::Completed).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_discount_rounds_half_away_from_zero() {
        let amounts = price_line(dec!(12345), 1, dec!(10));
        assert_eq!(amounts.subtotal, dec!(12345));
        assert_eq!(amounts.discount, dec!(1235));

        let amounts = price_line(dec!(150000), 3, dec!(0));
        assert_eq!(amounts.subtotal, dec!(450000));
        assert_eq!(amounts.discount, dec!(0));
    }

    #[test]
    fn included_tax_is_extracted_from_gross() {
        assert_eq!(included_tax(dec!(110000), dec!(0.1)), dec!(10000));
        assert_eq!(included_tax(dec!(0), dec!(0.1)), dec!(0));
    }

    #[test]
    fn cod_orders_skip_paid() {
        use OrderStatus::*;
        assert!(can_transition(Pending, Shipped, PaymentMethod::Cod));
        assert!(!can_transition(Pending, Shipped, PaymentMethod::PayOs));
        assert!(can_transition(Pending, Paid, PaymentMethod::PayOs));
        assert!(!can_transition(Paid, Cancelled, PaymentMethod::PayOs));
        assert!(!can_transition(Delivered, Cancelled, PaymentMethod::Cod));
        assert!(!can_transition(Cancelled, Pending, PaymentMethod::Cod));
    }
}
