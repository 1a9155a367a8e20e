use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget send; a closed channel is logged and otherwise ignored.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "event dropped");
        }
    }
}

// Domain events emitted by the services after their writes commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderPreviewed {
        preview_id: Uuid,
        customer_id: Uuid,
        quote_count: usize,
    },
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled(Uuid),

    BatchReceived {
        batch_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },
    StockExported {
        batch_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        movement_type: String,
    },
    LowStock {
        product_id: Uuid,
        remaining: i32,
    },

    PaymentLinkCreated {
        order_id: Uuid,
        order_code: i64,
    },
    PaymentCompleted(Uuid),
    PaymentFailed(Uuid),

    WalletCredited {
        vendor_id: Uuid,
        order_id: Uuid,
        amount: Decimal,
    },
    CashoutRequested {
        cashout_id: Uuid,
        vendor_id: Uuid,
        amount: Decimal,
    },
    CashoutApproved(Uuid),
    CashoutRejected(Uuid),
}

/// Drains the event channel, logging each event. Ends when every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderPreviewed {
                preview_id,
                customer_id,
                quote_count,
            } => {
                info!(%preview_id, %customer_id, quote_count, "order previewed");
            }
            Event::OrderCreated(order_id) => {
                info!(%order_id, "order created");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "order status changed");
            }
            Event::OrderCancelled(order_id) => {
                info!(%order_id, "order cancelled");
            }
            Event::BatchReceived {
                batch_id,
                product_id,
                quantity,
            } => {
                info!(%batch_id, %product_id, quantity, "batch received");
            }
            Event::StockExported {
                batch_id,
                product_id,
                quantity,
                movement_type,
            } => {
                info!(%batch_id, %product_id, quantity, %movement_type, "stock exported");
            }
            Event::LowStock {
                product_id,
                remaining,
            } => {
                warn!(%product_id, remaining, "low inventory");
            }
            Event::PaymentLinkCreated {
                order_id,
                order_code,
            } => {
                info!(%order_id, order_code, "payment link created");
            }
            Event::PaymentCompleted(order_id) => {
                info!(%order_id, "payment completed");
            }
            Event::PaymentFailed(order_id) => {
                warn!(%order_id, "payment failed");
            }
            Event::WalletCredited {
                vendor_id,
                order_id,
                amount,
            } => {
                info!(%vendor_id, %order_id, %amount, "wallet credited");
            }
            Event::CashoutRequested {
                cashout_id,
                vendor_id,
                amount,
            } => {
                info!(%cashout_id, %vendor_id, %amount, "cashout requested");
            }
            Event::CashoutApproved(cashout_id) => {
                info!(%cashout_id, "cashout approved");
            }
            Event::CashoutRejected(cashout_id) => {
                info!(%cashout_id, "cashout rejected");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        sender.send(Event::OrderCreated(Uuid::new_v4())).await.unwrap();
        drop(rx);
        assert!(sender.send(Event::OrderCreated(Uuid::new_v4())).await.is_err());
    }

    #[tokio::test]
    async fn process_events_drains_until_closed() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let handle = tokio::spawn(process_events(rx));
        sender.send_or_log(Event::CashoutApproved(Uuid::new_v4())).await;
        drop(sender);
        handle.await.unwrap();
    }
}
