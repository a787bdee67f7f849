use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use marina_core::{ChangeEvent, ChangeTable};
use tokio::sync::broadcast;
use tracing::debug;

/// Fan-out point for table change notifications.
///
/// Every published event gets the next sequence number, and subscribers see
/// events in sequence order. Publishing with no subscribers is not an error.
pub struct ChangeHub {
    tx: broadcast::Sender<ChangeEvent>,
    // Held across numbering and send so the channel order matches `seq`
    seq: Mutex<u64>,
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            seq: Mutex::new(0),
        }
    }

    pub fn publish(&self, table: ChangeTable, key: Option<String>) -> ChangeEvent {
        let mut seq = self.seq.lock().unwrap_or_else(PoisonError::into_inner);
        *seq += 1;
        let event = ChangeEvent {
            seq: *seq,
            table,
            key,
            at: Utc::now(),
        };
        let receivers = self.tx.send(event.clone()).unwrap_or(0);
        drop(seq);

        debug!(seq = event.seq, table = table.as_str(), receivers, "Change published");
        event
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Sequence number of the latest event, 0 before any.
    pub fn last_seq(&self) -> u64 {
        *self.seq.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(100)
    }
}
