//! Per-owner fan-out of status snapshots to live subscribers.
//!
//! Delivery is push-based and best-effort: a publish sends the owner's
//! current snapshot to every active subscription; a subscriber that lags
//! past the channel capacity misses intermediate pushes and re-fetches a
//! full snapshot (see the SSE route).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use crate::registry::{JobRegistry, StatusSnapshot};

/// Capacity of each owner's broadcast channel. Snapshots are self-contained,
/// so a lagged subscriber loses nothing it can't recover.
const CHANNEL_CAPACITY: usize = 16;

pub struct NotificationHub {
    registry: Arc<JobRegistry>,
    channels: RwLock<HashMap<String, broadcast::Sender<StatusSnapshot>>>,
}

impl NotificationHub {
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self {
            registry,
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Open a live channel of status snapshots for one owner. Dropping the
    /// receiver unsubscribes; the channel is pruned on a later publish.
    pub fn subscribe(&self, owner_id: &str) -> broadcast::Receiver<StatusSnapshot> {
        let mut channels = self.channels.write().unwrap();
        channels
            .entry(owner_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Push the owner's current snapshot to every active subscription.
    pub fn publish(&self, owner_id: &str) {
        let snapshot = self.registry.snapshot(Some(owner_id));
        let all_gone = {
            let channels = self.channels.read().unwrap();
            match channels.get(owner_id) {
                Some(tx) => tx.send(snapshot).is_err(),
                None => false,
            }
        };
        if all_gone {
            // Last subscriber disconnected; drop the channel. Re-check under
            // the write lock in case someone subscribed in between.
            let mut channels = self.channels.write().unwrap();
            if channels.get(owner_id).is_some_and(|tx| tx.receiver_count() == 0) {
                channels.remove(owner_id);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn channel_count(&self) -> usize {
        self.channels.read().unwrap().len()
    }
}
