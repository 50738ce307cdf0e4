use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use droidscope_types::{ArcLogRecord, LogRecord};

/// Identifier of a registered subscription
pub type SubscriptionId = u64;

type Predicate = Box<dyn Fn(&LogRecord) -> bool + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    name: String,
    predicate: Predicate,
    sink: mpsc::UnboundedSender<ArcLogRecord>,
}

struct Registry {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
    published: AtomicU64,
}

/// Publish/subscribe registry fanning each record out to every subscription
/// whose predicate accepts it.
///
/// Each subscription has its own unbounded queue, so a slow pane never holds
/// up the reader and per-subscription order is the publish order. Cloning
/// shares the registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                subscriptions: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                published: AtomicU64::new(0),
            }),
        }
    }

    /// Register a predicate; matching records arrive on the returned handle
    pub fn subscribe<F>(&self, name: impl Into<String>, predicate: F) -> SubscriptionHandle
    where
        F: Fn(&LogRecord) -> bool + Send + Sync + 'static,
    {
        let (sink, receiver) = mpsc::unbounded_channel();
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let name = name.into();

        self.registry.subscriptions.write().push(Subscription {
            id,
            name: name.clone(),
            predicate: Box::new(predicate),
            sink,
        });
        tracing::debug!(id, name = %name, "subscription added");

        SubscriptionHandle { id, name, receiver }
    }

    /// Remove a subscription; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.registry.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// Deliver a record to every matching subscription, in registration order.
    ///
    /// A panicking predicate only costs its own subscription this record.
    /// Subscriptions whose handle was dropped are removed. Returns the number
    /// of deliveries.
    pub fn publish(&self, record: ArcLogRecord) -> usize {
        self.registry.published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        let mut closed = Vec::new();
        {
            let subs = self.registry.subscriptions.read();
            for sub in subs.iter() {
                match catch_unwind(AssertUnwindSafe(|| (sub.predicate)(&record))) {
                    Ok(true) => {
                        if sub.sink.send(Arc::clone(&record)).is_ok() {
                            delivered += 1;
                        } else {
                            closed.push(sub.id);
                        }
                    }
                    Ok(false) => {}
                    Err(_) => {
                        tracing::warn!(id = sub.id, name = %sub.name, "subscription predicate panicked");
                    }
                }
            }
        }

        if !closed.is_empty() {
            self.registry
                .subscriptions
                .write()
                .retain(|s| !closed.contains(&s.id));
            tracing::debug!(removed = closed.len(), "pruned closed subscriptions");
        }

        delivered
    }

    /// Number of registered subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.registry.subscriptions.read().len()
    }

    /// Subscription names in registration order
    pub fn names(&self) -> Vec<String> {
        self.registry
            .subscriptions
            .read()
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    /// Total records published so far
    pub fn published(&self) -> u64 {
        self.registry.published.load(Ordering::Relaxed)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Live feed of the records accepted by one subscription
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    name: String,
    receiver: mpsc::UnboundedReceiver<ArcLogRecord>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the next record
    pub async fn recv(&mut self) -> Option<ArcLogRecord> {
        self.receiver.recv().await
    }

    /// Next record if one is queued
    pub fn try_recv(&mut self) -> Option<ArcLogRecord> {
        self.receiver.try_recv().ok()
    }

    /// Take everything queued right now
    pub fn drain(&mut self) -> Vec<ArcLogRecord> {
        let mut records = Vec::new();
        while let Ok(record) = self.receiver.try_recv() {
            records.push(record);
        }
        records
    }
}
