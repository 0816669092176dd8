//! Table event publishing.
//!
//! Every committed snapshot is published as a [`TableEvent::GameUpdate`].
//! Subscribers get a `tokio::sync::broadcast` receiver per table; a slow
//! subscriber lags and skips events instead of blocking the table.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

use crate::game::state::GameState;
use crate::wallet::TableId;

/// Buffered events per table before lagging receivers start skipping.
const EVENT_CHANNEL_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableEvent {
    /// Full snapshot after a committed change, with hole cards hidden.
    GameUpdate { table_id: TableId, state: GameState },
}

/// Publish/subscribe seam between table actors and transports.
pub trait EventPublisher: Send + Sync {
    /// Send `event` to every current subscriber of `table_id`.
    fn publish(&self, table_id: TableId, event: TableEvent);

    fn subscribe(&self, table_id: TableId) -> broadcast::Receiver<TableEvent>;
}

/// In-process event bus with one broadcast channel per table.
#[derive(Debug, Default)]
pub struct EventBus {
    channels: RwLock<HashMap<TableId, broadcast::Sender<TableEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self, table_id: TableId) -> usize {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Forget a closed table's channel. Existing receivers see the stream end.
    pub fn drop_table(&self, table_id: TableId) {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&table_id);
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, table_id: TableId, event: TableEvent) {
        let sender = self
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table_id)
            .cloned();

        match sender {
            Some(sender) => {
                // Err only means nobody is listening right now
                if let Ok(count) = sender.send(event) {
                    log::trace!("Table {}: event sent to {} subscribers", table_id, count);
                }
            }
            None => log::trace!("Table {}: no subscribers", table_id),
        }
    }

    fn subscribe(&self, table_id: TableId) -> broadcast::Receiver<TableEvent> {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let receiver = channels
            .entry(table_id)
            .or_insert_with(|| broadcast::channel(EVENT_CHANNEL_BUFFER).0)
            .subscribe();
        log::debug!("Table {}: new event subscriber", table_id);
        receiver
    }
}
