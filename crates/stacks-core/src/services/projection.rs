//! Observable, read-only view of the canonical store.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::store::CanonicalStore;
use crate::models::Pin;
use crate::Result;

/// Keeps an in-memory list of pins in step with the store
///
/// Consumers read with [`PinsProjection::current`] or wait on
/// [`PinsProjection::subscribe`]. The background task stops on drop.
pub struct PinsProjection {
    receiver: watch::Receiver<Arc<Vec<Pin>>>,
    task: JoinHandle<()>,
}

impl PinsProjection {
    /// Load the current pins and start following store events
    pub async fn spawn(store: CanonicalStore) -> Result<Self> {
        // Subscribe first so no change between fetch and listen is missed
        let mut events = store.subscribe();
        let initial = store.pins().await?;
        let (sender, receiver) = watch::channel(Arc::new(initial));

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Pins projection lagged by {skipped} events, refetching");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                match store.pins().await {
                    Ok(pins) => {
                        sender.send_replace(Arc::new(pins));
                    }
                    Err(e) => tracing::warn!("Failed to refresh pins projection: {e}"),
                }
            }
        });

        Ok(Self { receiver, task })
    }

    /// Latest pins, newest created first
    pub fn current(&self) -> Arc<Vec<Pin>> {
        self.receiver.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Pin>>> {
        self.receiver.clone()
    }
}

impl Drop for PinsProjection {
    fn drop(&mut self) {
        self.task.abort();
    }
}
