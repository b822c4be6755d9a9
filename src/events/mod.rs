use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Domain events emitted after successful operations. Consumers are
/// notification-only; the ledger itself is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    TransferCreated {
        tenant_id: i64,
        transfer_id: i64,
        transfer_number: String,
        status: String,
    },
    TransferShipped {
        tenant_id: i64,
        transfer_id: i64,
    },
    TransferReceived {
        tenant_id: i64,
        transfer_id: i64,
    },
    TransferCancelled {
        tenant_id: i64,
        transfer_id: i64,
        reason: String,
    },
    TransferUpdated {
        tenant_id: i64,
        transfer_id: i64,
    },
    StockAdjusted {
        tenant_id: i64,
        branch_id: i64,
        product_id: i64,
        quantity_changed: Decimal,
        new_stock: Decimal,
    },
    StockProduced {
        tenant_id: i64,
        branch_id: i64,
        transfer_id: i64,
        item_count: usize,
    },
}

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
}

/// Drains the event channel, logging each event. Runs until every sender is
/// dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        debug!(?event, "domain event");
    }
    info!("Event processor stopped");
}
