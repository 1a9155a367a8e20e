use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, IntoActiveModel, QueryFilter, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::with_transaction,
    entities::{
        cashout::{self, CashoutStatus},
        order, order_detail,
        transaction::{self, TransactionStatus, TransactionType},
        wallet,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

pub const CURRENCY: &str = "VND";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CashoutRequest {
    pub amount: Decimal,
    #[validate(length(min = 2, max = 32))]
    pub bank_code: String,
    #[validate(length(min = 4, max = 64))]
    pub bank_account_number: String,
    #[validate(length(min = 1, max = 255))]
    pub account_holder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletReconciliation {
    pub vendor_id: Uuid,
    pub cached_balance: Decimal,
    pub ledger_balance: Decimal,
    pub pending_cashouts: Decimal,
    pub available: Decimal,
    pub in_sync: bool,
}

/// One vendor's share of a delivered order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorCredit {
    pub vendor_id: Uuid,
    pub transaction_id: Uuid,
    pub amount: Decimal,
}

/// Vendor balances and payouts. `wallet.balance` only ever moves in the same
/// database transaction as the ledger row that justifies it.
#[derive(Clone)]
pub struct WalletService {
    db_pool: Arc<DatabaseConnection>,
    event_sender: EventSender,
    commission_rate: Decimal,
}

impl WalletService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        event_sender: EventSender,
        commission_rate: Decimal,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            commission_rate,
        }
    }

    pub async fn get_or_create_wallet(&self, vendor_id: Uuid) -> Result<wallet::Model, ServiceError> {
        get_or_create(&*self.db_pool, vendor_id).await
    }

    /// Balance recomputed from completed ledger rows.
    pub async fn ledger_balance(&self, vendor_id: Uuid) -> Result<Decimal, ServiceError> {
        ledger_balance_on(&*self.db_pool, vendor_id).await
    }

    #[instrument(skip(self))]
    pub async fn reconcile(&self, vendor_id: Uuid) -> Result<WalletReconciliation, ServiceError> {
        let db = &*self.db_pool;
        let wallet = get_or_create(db, vendor_id).await?;
        let ledger = ledger_balance_on(db, vendor_id).await?;
        let pending = pending_cashouts_on(db, vendor_id).await?;

        Ok(WalletReconciliation {
            vendor_id,
            cached_balance: wallet.balance,
            ledger_balance: ledger,
            pending_cashouts: pending,
            available: wallet.balance - pending,
            in_sync: wallet.balance == ledger,
        })
    }

    /// Credits each vendor on the order with its net line amounts minus the
    /// platform commission. Vendors already credited for this order are skipped.
    #[instrument(skip(self, txn, order, details), fields(order_id = %order.id))]
    pub async fn credit_vendors_for_order(
        &self,
        txn: &DatabaseTransaction,
        order: &order::Model,
        details: &[order_detail::Model],
    ) -> Result<Vec<VendorCredit>, ServiceError> {
        let mut per_vendor: BTreeMap<Uuid, Decimal> = BTreeMap::new();
        for detail in details {
            *per_vendor.entry(detail.vendor_id).or_default() += detail.net_amount();
        }

        let already: Vec<Uuid> = transaction::Entity::find()
            .select_only()
            .column(transaction::Column::UserId)
            .filter(transaction::Column::OrderId.eq(order.id))
            .filter(transaction::Column::TransactionType.eq(TransactionType::WalletCredit))
            .into_tuple()
            .all(txn)
            .await?;

        let mut credits = Vec::new();
        let now = Utc::now();
        for (vendor_id, gross) in per_vendor {
            if already.contains(&vendor_id) {
                continue;
            }
            let amount = vendor_share(gross, self.commission_rate);
            if amount <= Decimal::ZERO {
                continue;
            }

            get_or_create(txn, vendor_id).await?;
            let entry = transaction::ActiveModel {
                id: Set(Uuid::new_v4()),
                transaction_type: Set(TransactionType::WalletCredit),
                user_id: Set(vendor_id),
                order_id: Set(Some(order.id)),
                amount: Set(amount),
                currency: Set(CURRENCY.to_string()),
                status: Set(TransactionStatus::Completed),
                gateway_reference: Set(None),
                note: Set(Some(format!("Order {} delivered", order.id))),
                created_at: Set(now),
                completed_at: Set(Some(now)),
            }
            .insert(txn)
            .await?;

            wallet::Entity::update_many()
                .col_expr(wallet::Column::Balance, Expr::col(wallet::Column::Balance).add(amount))
                .col_expr(wallet::Column::UpdatedAt, Expr::value(now))
                .filter(wallet::Column::VendorId.eq(vendor_id))
                .exec(txn)
                .await?;

            credits.push(VendorCredit {
                vendor_id,
                transaction_id: entry.id,
                amount,
            });
        }

        Ok(credits)
    }

    /// Emits one event per credit; call after the crediting transaction commits.
    pub async fn announce_credits(&self, order_id: Uuid, credits: &[VendorCredit]) {
        for credit in credits {
            self.event_sender
                .send_or_log(Event::WalletCredited {
                    vendor_id: credit.vendor_id,
                    order_id,
                    amount: credit.amount,
                })
                .await;
        }
    }

    #[instrument(skip(self, request), fields(amount = %request.amount))]
    pub async fn request_cashout(
        &self,
        vendor_id: Uuid,
        request: CashoutRequest,
    ) -> Result<cashout::Model, ServiceError> {
        request.validate()?;
        if request.amount <= Decimal::ZERO || request.amount.fract() != Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "cashout amount must be a positive whole VND amount".to_string(),
            ));
        }

        let cashout = with_transaction(&self.db_pool, |txn| {
            Box::pin(async move {
                get_or_create(txn, vendor_id).await?;
                let wallet = wallet::Entity::find()
                    .filter(wallet::Column::VendorId.eq(vendor_id))
                    .lock_exclusive()
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Wallet for {} not found", vendor_id)))?;

                let pending = pending_cashouts_on(txn, vendor_id).await?;
                let available = wallet.balance - pending;
                if request.amount > available {
                    return Err(ServiceError::InvalidOperation(format!(
                        "requested {} but only {} is available",
                        request.amount, available
                    )));
                }

                let now = Utc::now();
                let entry = transaction::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    transaction_type: Set(TransactionType::WalletCashout),
                    user_id: Set(vendor_id),
                    order_id: Set(None),
                    amount: Set(request.amount),
                    currency: Set(CURRENCY.to_string()),
                    status: Set(TransactionStatus::Pending),
                    gateway_reference: Set(None),
                    note: Set(Some(format!("Cashout to {}", request.bank_code))),
                    created_at: Set(now),
                    completed_at: Set(None),
                }
                .insert(txn)
                .await?;

                let cashout = cashout::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    vendor_id: Set(vendor_id),
                    transaction_id: Set(entry.id),
                    amount: Set(request.amount),
                    bank_code: Set(request.bank_code.clone()),
                    bank_account_number: Set(request.bank_account_number.clone()),
                    account_holder: Set(request.account_holder.clone()),
                    status: Set(CashoutStatus::Pending),
                    reason: Set(None),
                    processed_by: Set(None),
                    processed_at: Set(None),
                    created_at: Set(now),
                }
                .insert(txn)
                .await?;

                Ok(cashout)
            })
        })
        .await?;

        info!(cashout_id = %cashout.id, "cashout requested");
        self.event_sender
            .send_or_log(Event::CashoutRequested {
                cashout_id: cashout.id,
                vendor_id,
                amount: cashout.amount,
            })
            .await;
        Ok(cashout)
    }

    #[instrument(skip(self))]
    pub async fn approve_cashout(
        &self,
        cashout_id: Uuid,
        admin_id: Uuid,
    ) -> Result<cashout::Model, ServiceError> {
        let cashout = with_transaction(&self.db_pool, |txn| {
            Box::pin(async move {
                let cashout = pending_cashout(txn, cashout_id).await?;
                let now = Utc::now();

                let debited = wallet::Entity::update_many()
                    .col_expr(
                        wallet::Column::Balance,
                        Expr::col(wallet::Column::Balance).sub(cashout.amount),
                    )
                    .col_expr(wallet::Column::UpdatedAt, Expr::value(now))
                    .filter(wallet::Column::VendorId.eq(cashout.vendor_id))
                    .filter(wallet::Column::Balance.gte(cashout.amount))
                    .exec(txn)
                    .await?;
                if debited.rows_affected == 0 {
                    return Err(ServiceError::InvalidOperation(format!(
                        "wallet balance cannot cover cashout {}",
                        cashout_id
                    )));
                }

                set_transaction_status(txn, cashout.transaction_id, TransactionStatus::Completed).await?;

                let mut active = cashout.into_active_model();
                active.status = Set(CashoutStatus::Approved);
                active.processed_by = Set(Some(admin_id));
                active.processed_at = Set(Some(now));
                Ok(active.update(txn).await?)
            })
        })
        .await?;

        self.event_sender
            .send_or_log(Event::CashoutApproved(cashout.id))
            .await;
        Ok(cashout)
    }

    #[instrument(skip(self, reason))]
    pub async fn reject_cashout(
        &self,
        cashout_id: Uuid,
        admin_id: Uuid,
        reason: String,
    ) -> Result<cashout::Model, ServiceError> {
        if reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "a rejection reason is required".to_string(),
            ));
        }

        let cashout = with_transaction(&self.db_pool, |txn| {
            Box::pin(async move {
                let cashout = pending_cashout(txn, cashout_id).await?;
                set_transaction_status(txn, cashout.transaction_id, TransactionStatus::Cancelled).await?;

                let mut active = cashout.into_active_model();
                active.status = Set(CashoutStatus::Rejected);
                active.reason = Set(Some(reason));
                active.processed_by = Set(Some(admin_id));
                active.processed_at = Set(Some(Utc::now()));
                Ok(active.update(txn).await?)
            })
        })
        .await?;

        self.event_sender
            .send_or_log(Event::CashoutRejected(cashout.id))
            .await;
        Ok(cashout)
    }
}

/// Vendor payout after commission, rounded to whole VND.
pub fn vendor_share(gross: Decimal, commission_rate: Decimal) -> Decimal {
    (gross * (Decimal::ONE - commission_rate)).round_dp(0)
}

async fn get_or_create<C: ConnectionTrait>(conn: &C, vendor_id: Uuid) -> Result<wallet::Model, ServiceError> {
    if let Some(existing) = wallet::Entity::find()
        .filter(wallet::Column::VendorId.eq(vendor_id))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let now = Utc::now();
    let created = wallet::ActiveModel {
        id: Set(Uuid::new_v4()),
        vendor_id: Set(vendor_id),
        balance: Set(Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await;

    match created {
        Ok(model) => Ok(model),
        // Lost a creation race on the unique vendor_id; read the winner's row.
        Err(e) => wallet::Entity::find()
            .filter(wallet::Column::VendorId.eq(vendor_id))
            .one(conn)
            .await?
            .ok_or(ServiceError::DatabaseError(e)),
    }
}

async fn ledger_balance_on<C: ConnectionTrait>(conn: &C, vendor_id: Uuid) -> Result<Decimal, ServiceError> {
    let rows: Vec<(TransactionType, Decimal)> = transaction::Entity::find()
        .select_only()
        .column(transaction::Column::TransactionType)
        .column(transaction::Column::Amount)
        .filter(transaction::Column::UserId.eq(vendor_id))
        .filter(transaction::Column::Status.eq(TransactionStatus::Completed))
        .filter(transaction::Column::TransactionType.is_in([
            TransactionType::WalletCredit,
            TransactionType::WalletCashout,
        ]))
        .into_tuple()
        .all(conn)
        .await?;

    Ok(rows.into_iter().fold(Decimal::ZERO, |acc, (kind, amount)| match kind {
        TransactionType::WalletCredit => acc + amount,
        TransactionType::WalletCashout => acc - amount,
        TransactionType::PaymentIn => acc,
    }))
}

async fn pending_cashouts_on<C: ConnectionTrait>(conn: &C, vendor_id: Uuid) -> Result<Decimal, ServiceError> {
    let amounts: Vec<Decimal> = transaction::Entity::find()
        .select_only()
        .column(transaction::Column::Amount)
        .filter(transaction::Column::UserId.eq(vendor_id))
        .filter(transaction::Column::TransactionType.eq(TransactionType::WalletCashout))
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(amounts.into_iter().sum())
}

async fn pending_cashout(txn: &DatabaseTransaction, cashout_id: Uuid) -> Result<cashout::Model, ServiceError> {
    let cashout = cashout::Entity::find_by_id(cashout_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Cashout {} not found", cashout_id)))?;
    if cashout.status != CashoutStatus::Pending {
        return Err(ServiceError::InvalidStatus(format!(
            "cashout {} is already {}",
            cashout_id, cashout.status
        )));
    }
    Ok(cashout)
}

pub(crate) async fn set_transaction_status<C: ConnectionTrait>(
    conn: &C,
    transaction_id: Uuid,
    status: TransactionStatus,
) -> Result<(), ServiceError> {
    let completed_at = (status == TransactionStatus::Completed).then(Utc::now);
    let result = transaction::Entity::update_many()
        .col_expr(transaction::Column::Status, Expr::value(status))
        .col_expr(transaction::Column::CompletedAt, Expr::value(completed_at))
        .filter(transaction::Column::Id.eq(transaction_id))
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(transaction_id));
    }
    Ok(())
}
