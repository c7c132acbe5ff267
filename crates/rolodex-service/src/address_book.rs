//! Contact registry
//!
//! Keeps one entry per logical contact that has been read: its record
//! handles, with capability sets cached, and the unified contact built from
//! them. Aggregator events keep entries fresh and feed the change notifier.
//!
//! `update` calls for one contact are serialized by a per-contact lock.
//! Updates of different contacts run concurrently.

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::notify::{BroadcastSink, ChangeNotifier, ContactChange};
use dashmap::DashMap;
use rolodex_model::{ContactId, FieldCategory, LogicalContact};
use rolodex_store::{build, Aggregator, AggregatorEvent, RecordSet, SourceInfo};
use rolodex_sync::UpdateSession;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct Entry {
    records: RecordSet,
    contact: LogicalContact,
}

struct Inner {
    aggregator: Arc<dyn Aggregator>,
    config: ServiceConfig,
    entries: DashMap<ContactId, Entry>,
    locks: DashMap<ContactId, Arc<Mutex<()>>>,
    notifier: ChangeNotifier,
    sink: BroadcastSink,
    listener: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

/// Unified contacts over an aggregator
#[derive(Clone)]
pub struct AddressBook {
    inner: Arc<Inner>,
}

impl AddressBook {
    /// Address book over `aggregator`. Must be called within a Tokio runtime.
    #[must_use]
    pub fn new(aggregator: Arc<dyn Aggregator>, config: ServiceConfig) -> Self {
        let sink = BroadcastSink::new(config.notify_capacity);
        let notifier = ChangeNotifier::spawn(Arc::new(sink.clone()), config.debounce());
        let events = aggregator.subscribe();

        let inner = Arc::new(Inner {
            aggregator,
            config,
            entries: DashMap::new(),
            locks: DashMap::new(),
            notifier,
            sink,
            listener: parking_lot::Mutex::new(None),
        });

        let listener = tokio::spawn(listen(Arc::downgrade(&inner), events));
        *inner.listener.lock() = Some(listener);

        tracing::info!(
            debounce_ms = inner.config.notify_debounce_ms,
            primary_store = ?inner.primary_store(),
            "address book started"
        );
        Self { inner }
    }

    /// Unified view of a contact
    ///
    /// # Errors
    /// - `ServiceError::NotFound` if the aggregator does not know the contact
    pub fn get_unified_contact(&self, id: &ContactId) -> Result<LogicalContact, ServiceError> {
        self.inner.entry(id).map(|entry| entry.contact)
    }

    /// Unified view restricted to `categories`
    ///
    /// # Errors
    /// - `ServiceError::NotFound` if the aggregator does not know the contact
    pub fn copy(&self, id: &ContactId, categories: &[FieldCategory]) -> Result<LogicalContact, ServiceError> {
        self.get_unified_contact(id)
            .map(|contact| contact.project(categories))
    }

    /// Propagate `desired` to the contact's records
    ///
    /// The session runs on its own task: if the caller stops waiting, the
    /// session still finishes. Either way the contact is rebuilt; a
    /// successful update schedules an `Updated` change.
    ///
    /// # Errors
    /// - `ServiceError::NotFound` if the aggregator does not know the contact
    /// - `ServiceError::Sync` with the first fatal error of the session
    /// - `ServiceError::SessionAborted` if the session task panicked
    pub async fn update(&self, id: &ContactId, desired: LogicalContact) -> Result<(), ServiceError> {
        self.update_one(id, desired).await.map(drop)
    }

    /// Propagate several contacts, one after another
    ///
    /// Every desired contact is addressed by its own id. The result holds one
    /// entry per input, in input order: the rebuilt contact, or that
    /// contact's error. The primary store is flushed once the batch is done.
    pub async fn update_contacts(
        &self,
        contacts: Vec<LogicalContact>,
    ) -> Vec<Result<LogicalContact, ServiceError>> {
        let mut results = Vec::with_capacity(contacts.len());
        for desired in contacts {
            let id = desired.id().clone();
            let result = self.update_one(&id, desired).await;
            if let Err(error) = &result {
                tracing::debug!(contact = %id, %error, "contact not updated");
            }
            results.push(result);
        }

        self.inner.flush_primary_store().await;
        tracing::info!(
            contacts = results.len(),
            updated = results.iter().filter(|r| r.is_ok()).count(),
            "batch update finished"
        );
        results
    }

    async fn update_one(&self, id: &ContactId, desired: LogicalContact) -> Result<LogicalContact, ServiceError> {
        self.inner.entry(id)?;

        let lock = Arc::clone(&self.inner.locks.entry(id.clone()).or_default());
        let inner = Arc::clone(&self.inner);
        let id = id.clone();

        let session = tokio::spawn(async move {
            let _guard = lock.lock_owned().await;
            inner.run_update(id, desired).await
        });

        session
            .await
            .map_err(|e| ServiceError::SessionAborted(e.to_string()))?
    }

    /// Every known logical contact
    #[must_use]
    pub fn contact_ids(&self) -> Vec<ContactId> {
        self.inner.aggregator.contact_ids()
    }

    /// The aggregator's stores
    #[must_use]
    pub fn sources(&self) -> Vec<SourceInfo> {
        self.inner.aggregator.sources()
    }

    /// Receive change batches
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ContactChange> {
        self.inner.sink.subscribe()
    }

    /// Emit pending change batches now
    pub async fn flush_notifications(&self) {
        self.inner.notifier.flush().await;
    }
}

impl Inner {
    fn primary_store(&self) -> Option<String> {
        self.config
            .primary_store
            .clone()
            .or_else(|| self.aggregator.primary_store())
    }

    /// Cached entry, built on first use
    fn entry(&self, id: &ContactId) -> Result<Entry, ServiceError> {
        if let Some(entry) = self.entries.get(id) {
            return Ok(Entry::clone(&entry));
        }

        let records = self
            .aggregator
            .records(id)
            .ok_or_else(|| ServiceError::NotFound(id.clone()))?;
        let records = RecordSet::from_records(records);
        let contact = build(id, &records);
        let entry = Entry { records, contact };
        self.entries.insert(id.clone(), entry.clone());
        Ok(entry)
    }

    /// Rebuild a cached entry from the aggregator's current record list
    fn refresh(&self, id: &ContactId) {
        let Some(previous) = self.entries.get(id).map(|e| e.records.clone()) else {
            return;
        };
        match self.aggregator.records(id) {
            Some(records) => {
                let records = previous.refresh(records);
                let contact = build(id, &records);
                self.entries.insert(id.clone(), Entry { records, contact });
            }
            None => {
                self.entries.remove(id);
            }
        }
    }

    async fn flush_primary_store(&self) {
        let Some(store) = self.primary_store() else {
            return;
        };
        if let Err(error) = self.aggregator.flush(&store).await {
            tracing::warn!(%store, %error, "failed to flush primary store");
        }
    }

    async fn run_update(&self, id: ContactId, desired: LogicalContact) -> Result<LogicalContact, ServiceError> {
        let Entry { records, contact } = self.entry(&id)?;

        let mut session = UpdateSession::new(Arc::clone(&self.aggregator), records, contact, desired);
        if let Some(store) = &self.config.primary_store {
            session = session.with_primary_store(store.clone());
        }
        let outcome = session.run().await;

        let current = outcome.contact_id;
        if current != id {
            tracing::info!(from = %id, to = %current, "contact moved by update");
            self.entries.remove(&id);
            if let Some((_, lock)) = self.locks.remove(&id) {
                self.locks.insert(current.clone(), lock);
            }
        }

        let rebuilt = match outcome.rebuilt {
            Some(rebuilt) => {
                let contact = rebuilt.contact.clone();
                self.entries.insert(
                    current.clone(),
                    Entry {
                        records: rebuilt.records,
                        contact: rebuilt.contact,
                    },
                );
                Some(contact)
            }
            None => {
                self.entries.remove(&current);
                None
            }
        };

        outcome.result?;
        self.notifier.changed(current.clone());
        rebuilt.ok_or(ServiceError::NotFound(current))
    }

    fn handle(&self, event: AggregatorEvent) {
        tracing::trace!(?event, "aggregator event");
        match event {
            AggregatorEvent::ContactAdded(id) => self.notifier.added(id),
            AggregatorEvent::ContactRemoved(id) => {
                self.entries.remove(&id);
                self.locks.remove(&id);
                self.notifier.removed(id);
            }
            AggregatorEvent::RecordsChanged(id) => {
                self.refresh(&id);
                self.notifier.changed(id);
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}

async fn listen(inner: Weak<Inner>, mut events: broadcast::Receiver<AggregatorEvent>) {
    loop {
        let event = events.recv().await;
        let Some(book) = inner.upgrade() else {
            break;
        };
        match event {
            Ok(event) => book.handle(event),
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "missed aggregator events, dropping cached contacts");
                let ids: Vec<ContactId> = book.entries.iter().map(|e| e.key().clone()).collect();
                book.entries.clear();
                for id in ids {
                    book.notifier.changed(id);
                }
            }
            Err(RecvError::Closed) => {
                tracing::debug!("aggregator event stream closed");
                break;
            }
        }
    }
}
