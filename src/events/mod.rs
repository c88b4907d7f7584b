use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::entities::order::{OrderStatus, PaymentStatus};

/// Domain events emitted by the services after a successful state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    PaymentStatusChanged {
        order_id: Uuid,
        new_status: PaymentStatus,
    },

    // Cart events
    CartUpdated(Uuid),
    CouponApplied {
        cart_id: Uuid,
        code: String,
    },

    // Identity events
    UserRegistered(Uuid),
    UserDeactivated(Uuid),

    // Catalog events
    ProductCreated(Uuid),
    ProductDeleted(Uuid),

    // Seller workflow events
    SellerRequestSubmitted(Uuid),
    SellerRequestApproved(Uuid),
    SellerRequestRejected(Uuid),
}

/// Cloneable handle used by services to publish [`Event`]s.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a full or closed channel is logged, never surfaced to
    /// the triggering operation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("event dropped: {}", e);
        }
    }
}

/// Drains the event channel. Currently events feed the structured log;
/// downstream consumers attach here.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "domain event");
    }
}

/// Convenience constructor for an [`EventSender`] wired to a running
/// processor task.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}
