pub mod payos;

pub use payos::{PayOsClient, PaymentLink, PaymentLinkRequest, WebhookBody, WebhookData};

use chrono::Utc;
use metrics::counter;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::with_transaction,
    entities::{
        order::{self, OrderStatus, PaymentMethod},
        payment::{self, PaymentStatus},
        transaction::{self, TransactionStatus, TransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::wallet::set_transaction_status,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLinkResult {
    pub order_id: Uuid,
    pub order_code: i64,
    pub checkout_url: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Completed,
    AlreadyProcessed,
    Failed,
    /// Money was captured for an order cancelled before the webhook landed.
    /// The gateway response is kept so the customer can be refunded.
    PaidAfterCancel,
    /// No payment carries the order code, e.g. the PayOS dashboard test ping.
    Ignored,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Completed => "completed",
            WebhookOutcome::AlreadyProcessed => "already_processed",
            WebhookOutcome::Failed => "failed",
            WebhookOutcome::PaidAfterCancel => "paid_after_cancel",
            WebhookOutcome::Ignored => "ignored",
        }
    }
}

/// Gateway order code for an order: the top 51 bits of its id, which keeps it
/// stable across link re-creation and inside PayOS's safe integer range.
pub fn order_code_for(order_id: Uuid) -> i64 {
    (order_id.as_u128() >> 77) as i64
}

#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    payos: Arc<PayOsClient>,
}

impl PaymentService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        event_sender: EventSender,
        payos: Arc<PayOsClient>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            payos,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_payos_link(&self, order_id: Uuid) -> Result<PaymentLinkResult, ServiceError> {
        let db = &*self.db_pool;
        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if order.payment_method != PaymentMethod::PayOs {
            return Err(ServiceError::InvalidOperation(format!(
                "order {} is paid by {}",
                order_id, order.payment_method
            )));
        }
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "order {} is {}, payment links need a pending order",
                order_id, order.status
            )));
        }

        let payment = payment::Entity::find()
            .filter(payment::Column::OrderId.eq(order_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment for order {} not found", order_id)))?;
        if payment.status != PaymentStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "payment for order {} is {}",
                order_id, payment.status
            )));
        }
        if let (Some(code), Some(url)) = (payment.gateway_order_code, payment.checkout_url.clone()) {
            return Ok(PaymentLinkResult {
                order_id,
                order_code: code,
                checkout_url: url,
                amount: payment.amount,
            });
        }

        let order_code = order_code_for(order_id);
        let amount = payment.amount.round().to_i64().ok_or_else(|| {
            ServiceError::InvalidOperation(format!("payment amount {} out of range", payment.amount))
        })?;
        let link = self
            .payos
            .create_payment_link(&PaymentLinkRequest {
                order_code,
                amount,
                description: format!("DH{}", order_code),
            })
            .await?;

        let mut active = payment.into_active_model();
        active.gateway_order_code = Set(Some(order_code));
        active.gateway_payment_id = Set(link.payment_link_id.clone());
        active.checkout_url = Set(Some(link.checkout_url.clone()));
        active.updated_at = Set(Some(Utc::now()));
        let payment = active.update(db).await?;

        info!(order_code, "PayOS link created");
        self.event_sender
            .send_or_log(Event::PaymentLinkCreated { order_id, order_code })
            .await;

        Ok(PaymentLinkResult {
            order_id,
            order_code,
            checkout_url: link.checkout_url,
            amount: payment.amount,
        })
    }

    #[instrument(skip(self, body), fields(code = %body.code))]
    pub async fn handle_payos_webhook(&self, body: WebhookBody) -> Result<WebhookOutcome, ServiceError> {
        if let Err(e) = self.payos.verify_webhook(&body) {
            counter!("verdant_payos_webhooks_total", 1, "outcome" => "rejected");
            return Err(e);
        }
        let data = body.parsed_data()?;
        let succeeded = body.is_success();
        let raw = body.data.clone();

        let (outcome, order_id) = with_transaction(&self.db_pool, |txn| {
            Box::pin(async move {
                let Some(payment) = payment::Entity::find()
                    .filter(payment::Column::GatewayOrderCode.eq(data.order_code))
                    .lock_exclusive()
                    .one(txn)
                    .await?
                else {
                    return Ok((WebhookOutcome::Ignored, None));
                };
                let order_id = payment.order_id;
                if payment.status == PaymentStatus::Cancelled && succeeded {
                    warn!(
                        %order_id,
                        order_code = data.order_code,
                        amount = data.amount,
                        "PayOS captured payment for a cancelled order; refund required"
                    );
                    let mut active = payment.into_active_model();
                    active.gateway_response = Set(Some(raw));
                    active.updated_at = Set(Some(Utc::now()));
                    if let Some(reference) = data.reference.clone() {
                        active.gateway_payment_id = Set(Some(reference));
                    }
                    active.update(txn).await?;
                    return Ok((WebhookOutcome::PaidAfterCancel, Some(order_id)));
                }
                if payment.status != PaymentStatus::Pending {
                    return Ok((WebhookOutcome::AlreadyProcessed, Some(order_id)));
                }

                let amount_matches = Decimal::from(data.amount) == payment.amount;
                if !amount_matches {
                    warn!(expected = %payment.amount, received = data.amount, "PayOS amount mismatch");
                }
                let now = Utc::now();
                let completed = succeeded && amount_matches;

                let payment_in = transaction::Entity::find()
                    .filter(transaction::Column::OrderId.eq(order_id))
                    .filter(transaction::Column::TransactionType.eq(TransactionType::PaymentIn))
                    .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
                    .one(txn)
                    .await?;

                let mut active = payment.into_active_model();
                active.gateway_response = Set(Some(raw));
                active.updated_at = Set(Some(now));
                if let Some(reference) = data.reference.clone() {
                    active.gateway_payment_id = Set(Some(reference));
                }

                if completed {
                    active.status = Set(PaymentStatus::Completed);
                    active.paid_at = Set(Some(now));
                    active.update(txn).await?;

                    if let Some(entry) = payment_in {
                        transaction::Entity::update_many()
                            .col_expr(
                                transaction::Column::GatewayReference,
                                Expr::value(data.reference.clone()),
                            )
                            .filter(transaction::Column::Id.eq(entry.id))
                            .exec(txn)
                            .await?;
                        set_transaction_status(txn, entry.id, TransactionStatus::Completed).await?;
                    }

                    let moved = order::Entity::update_many()
                        .col_expr(order::Column::Status, Expr::value(OrderStatus::Paid))
                        .col_expr(order::Column::UpdatedAt, Expr::value(Some(now)))
                        .filter(order::Column::Id.eq(order_id))
                        .filter(order::Column::Status.eq(OrderStatus::Pending))
                        .exec(txn)
                        .await?;
                    if moved.rows_affected == 0 {
                        warn!(%order_id, "payment completed for an order that is no longer pending");
                    }
                    Ok((WebhookOutcome::Completed, Some(order_id)))
                } else {
                    active.status = Set(PaymentStatus::Failed);
                    active.update(txn).await?;
                    if let Some(entry) = payment_in {
                        set_transaction_status(txn, entry.id, TransactionStatus::Failed).await?;
                    }
                    Ok((WebhookOutcome::Failed, Some(order_id)))
                }
            })
        })
        .await?;

        counter!("verdant_payos_webhooks_total", 1, "outcome" => outcome.as_str());
        match (outcome, order_id) {
            (WebhookOutcome::Completed, Some(order_id)) => {
                self.event_sender
                    .send_or_log(Event::OrderStatusChanged {
                        order_id,
                        old_status: OrderStatus::Pending.to_string(),
                        new_status: OrderStatus::Paid.to_string(),
                    })
                    .await;
                self.event_sender.send_or_log(Event::PaymentCompleted(order_id)).await;
            }
            (WebhookOutcome::Failed, Some(order_id)) => {
                self.event_sender.send_or_log(Event::PaymentFailed(order_id)).await;
            }
            _ => {}
        }
        Ok(outcome)
    }
}
