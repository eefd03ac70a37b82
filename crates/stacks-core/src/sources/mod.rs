//! Source adapters: external systems that observe pins.
//!
//! A source publishes its complete current view of the user's pins whenever
//! it changes. Every publication is applied to the canonical store as a
//! full-refresh batch; nothing reads from a source except through
//! [`spawn_source_sync`].

pub mod firestore;
pub mod pinboard;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::Pin;
use crate::services::UpsertOrchestrator;
use crate::Result;

/// A stream of full-collection observations
pub trait PinSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Latest collection; `changed()` fires on each new publication
    fn subscribe(&self) -> watch::Receiver<Vec<Pin>>;
}

/// In-process [`PinSource`] that an adapter publishes into
#[derive(Clone)]
pub struct SourceFeed {
    name: String,
    sender: Arc<watch::Sender<Vec<Pin>>>,
}

impl SourceFeed {
    pub fn new(name: impl Into<String>) -> Self {
        let (sender, _) = watch::channel(Vec::new());
        Self {
            name: name.into(),
            sender: Arc::new(sender),
        }
    }

    /// Replace the published collection
    pub fn publish(&self, pins: Vec<Pin>) {
        tracing::debug!("Source {} published {} pins", self.name, pins.len());
        self.sender.send_replace(pins);
    }
}

impl PinSource for SourceFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self) -> watch::Receiver<Vec<Pin>> {
        self.sender.subscribe()
    }
}

/// Apply every publication of `source` to the store until the source closes
///
/// A non-empty collection already published when the task starts is applied
/// first.
pub fn spawn_source_sync<S>(orchestrator: UpsertOrchestrator, source: &S) -> JoinHandle<()>
where
    S: PinSource + ?Sized,
{
    let name = source.name().to_string();
    let mut receiver = source.subscribe();

    tokio::spawn(async move {
        let initial = receiver.borrow_and_update().clone();
        if !initial.is_empty() {
            apply(&orchestrator, &name, initial).await;
        }
        while receiver.changed().await.is_ok() {
            let pins = receiver.borrow_and_update().clone();
            apply(&orchestrator, &name, pins).await;
        }
        tracing::info!("Source {name} closed");
    })
}

async fn apply(orchestrator: &UpsertOrchestrator, name: &str, pins: Vec<Pin>) {
    tracing::info!("Source {name} emitted {} pins", pins.len());
    if let Err(e) = orchestrator.upsert_batch(pins).await {
        tracing::warn!("Failed to apply batch from {name}: {e}");
    }
}

/// Decode every record, logging and dropping the ones that fail
pub(crate) fn decode_batch<T, F>(source: &str, records: &[T], decode: F) -> Vec<Pin>
where
    F: Fn(&T) -> Result<Option<Pin>>,
{
    let mut pins = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match decode(record) {
            Ok(Some(pin)) => pins.push(pin),
            Ok(None) => tracing::debug!("Skipping empty {source} record {index}"),
            Err(e) => tracing::warn!("Skipping malformed {source} record {index}: {e}"),
        }
    }
    pins
}
