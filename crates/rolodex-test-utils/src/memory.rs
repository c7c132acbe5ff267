//! In-memory aggregator and records
//!
//! Every backend call is appended to a shared journal so tests can assert
//! the exact sequence of writes, creations and links.

use async_trait::async_trait;
use parking_lot::Mutex;
use rolodex_model::{ContactId, FieldCategory, FieldValue};
use rolodex_store::{
    Aggregator, AggregatorError, AggregatorEvent, BackingRecord, CategoryData, CategorySnapshot,
    CategoryUpdate, RecordField, RecordRef, SlottedField, SourceInfo, StoreError,
    SINGLE_VALUE_SLOT,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use ulid::Ulid;

/// A backend call seen by the in-memory aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Record write attempt
    Write {
        record: String,
        category: FieldCategory,
        update: CategoryUpdate,
    },
    /// Record created
    Create {
        store: String,
        record: String,
        categories: Vec<FieldCategory>,
    },
    /// Records linked
    Link {
        records: Vec<String>,
        contact: ContactId,
    },
    /// Store flushed
    Flush { store: String },
}

#[derive(Debug)]
struct Shared {
    journal: Mutex<Vec<Operation>>,
    events: broadcast::Sender<AggregatorEvent>,
    membership: Mutex<BTreeMap<String, ContactId>>,
}

impl Shared {
    fn log(&self, operation: Operation) {
        self.journal.lock().push(operation);
    }

    fn emit(&self, event: AggregatorEvent) {
        let _ = self.events.send(event);
    }

    fn record_changed(&self, uid: &str) {
        let contact = self.membership.lock().get(uid).cloned();
        if let Some(contact) = contact {
            self.emit(AggregatorEvent::RecordsChanged(contact));
        }
    }
}

/// Description of a record to seed a contact with
#[derive(Debug, Clone)]
pub struct RecordSeed {
    store: String,
    uid: Option<String>,
    writable: Vec<FieldCategory>,
    fields: Vec<RecordField>,
}

impl RecordSeed {
    pub fn new(store: &str) -> Self {
        Self {
            store: store.to_string(),
            uid: None,
            writable: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn uid(mut self, uid: &str) -> Self {
        self.uid = Some(uid.to_string());
        self
    }

    pub fn writable(mut self, categories: impl IntoIterator<Item = FieldCategory>) -> Self {
        self.writable.extend(categories);
        self
    }

    pub fn with(self, value: FieldValue) -> Self {
        self.with_field(RecordField::new(value))
    }

    pub fn with_params(self, value: FieldValue, parameters: &[&str]) -> Self {
        self.with_field(RecordField::new(value).with_parameters(parameters.iter().copied()))
    }

    pub fn with_field(mut self, field: RecordField) -> Self {
        self.fields.push(field);
        self
    }

    /// Seeded values grouped into per-category updates
    fn updates(&self) -> Vec<(FieldCategory, CategoryUpdate)> {
        let mut grouped: BTreeMap<FieldCategory, CategoryUpdate> = BTreeMap::new();
        for field in &self.fields {
            let category = field.value.category();
            let entry = grouped
                .entry(category)
                .or_insert_with(|| CategoryUpdate::empty_for(category));
            match (entry, &field.value) {
                (CategoryData::Single(slot), _) => {
                    slot.get_or_insert_with(|| field.clone());
                }
                (CategoryData::Set(values), _) => values.push(field.clone()),
                (CategoryData::Accounts(map), FieldValue::OnlineAccount(account)) => map
                    .entry(account.protocol.as_str().to_string())
                    .or_default()
                    .push(field.clone()),
                (CategoryData::Accounts(_), _) => {}
            }
        }
        grouped.into_iter().collect()
    }
}

#[derive(Debug, Default)]
struct RecordState {
    values: BTreeMap<FieldCategory, CategorySnapshot>,
    last_slot: u32,
}

impl RecordState {
    fn next_slot(&mut self) -> u32 {
        self.last_slot += 1;
        self.last_slot
    }

    /// Store an update; values equal to a previous one keep its slot
    fn store(&mut self, category: FieldCategory, update: CategoryUpdate) {
        let mut previous: Vec<SlottedField> = match self.values.remove(&category) {
            Some(CategoryData::Single(value)) => value.into_iter().collect(),
            Some(CategoryData::Set(values)) => values,
            Some(CategoryData::Accounts(map)) => map.into_values().flatten().collect(),
            None => Vec::new(),
        };

        let snapshot = match update {
            CategoryData::Single(value) => CategoryData::Single(value.map(|field| SlottedField {
                slot: SINGLE_VALUE_SLOT,
                field,
            })),
            CategoryData::Set(values) => CategoryData::Set(self.slot_all(values, &mut previous)),
            CategoryData::Accounts(map) => CategoryData::Accounts(
                map.into_iter()
                    .map(|(protocol, values)| (protocol, self.slot_all(values, &mut previous)))
                    .collect(),
            ),
        };
        self.values.insert(category, snapshot);
    }

    fn slot_all(&mut self, fields: Vec<RecordField>, previous: &mut Vec<SlottedField>) -> Vec<SlottedField> {
        fields
            .into_iter()
            .map(|field| {
                let slot = match previous.iter().position(|p| p.field == field) {
                    Some(index) => previous.remove(index).slot,
                    None => self.next_slot(),
                };
                SlottedField { slot, field }
            })
            .collect()
    }
}

/// Backing record held in memory
#[derive(Debug)]
pub struct InMemoryRecord {
    uid: String,
    store: String,
    writable: Vec<FieldCategory>,
    state: Mutex<RecordState>,
    removed: AtomicBool,
    remove_on_write: AtomicBool,
    failures: Mutex<BTreeMap<FieldCategory, String>>,
    shared: Arc<Shared>,
}

impl InMemoryRecord {
    fn new(uid: String, store: String, writable: Vec<FieldCategory>, shared: Arc<Shared>) -> Self {
        Self {
            uid,
            store,
            writable,
            state: Mutex::new(RecordState::default()),
            removed: AtomicBool::new(false),
            remove_on_write: AtomicBool::new(false),
            failures: Mutex::new(BTreeMap::new()),
            shared,
        }
    }

    /// Make every write of `category` fail with `message`
    pub fn fail_writes(&self, category: FieldCategory, message: &str) {
        self.failures.lock().insert(category, message.to_string());
    }

    /// Delete the record as soon as its next write is accepted
    pub fn remove_after_next_write(&self) {
        self.remove_on_write.store(true, Ordering::SeqCst);
    }

    /// Stored values of a category, ignoring removal
    pub fn stored(&self, category: FieldCategory) -> Option<CategorySnapshot> {
        self.state.lock().values.get(&category).cloned()
    }

    /// Stored values of a category, flattened
    pub fn stored_values(&self, category: FieldCategory) -> Vec<FieldValue> {
        match self.stored(category) {
            Some(CategoryData::Single(value)) => value.map(|s| s.field.value).into_iter().collect(),
            Some(CategoryData::Set(values)) => values.into_iter().map(|s| s.field.value).collect(),
            Some(CategoryData::Accounts(map)) => map
                .into_values()
                .flatten()
                .map(|s| s.field.value)
                .collect(),
            None => Vec::new(),
        }
    }

    fn mark_removed(&self) {
        self.removed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BackingRecord for InMemoryRecord {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn store_id(&self) -> &str {
        &self.store
    }

    fn writable_categories(&self) -> Vec<FieldCategory> {
        self.writable.clone()
    }

    fn read(&self, category: FieldCategory) -> Result<Option<CategorySnapshot>, StoreError> {
        if self.is_removed() {
            return Err(StoreError::RecordRemoved(self.uid.clone()));
        }
        Ok(self.stored(category))
    }

    async fn write(&self, category: FieldCategory, update: CategoryUpdate) -> Result<(), StoreError> {
        tokio::task::yield_now().await;

        self.shared.log(Operation::Write {
            record: self.uid.clone(),
            category,
            update: update.clone(),
        });

        if self.is_removed() {
            return Err(StoreError::RecordRemoved(self.uid.clone()));
        }
        if let Some(message) = self.failures.lock().get(&category).cloned() {
            return Err(StoreError::Backend(message));
        }
        if !self.writable.contains(&category) {
            return Err(StoreError::Unsupported {
                record: self.uid.clone(),
                category,
            });
        }

        self.state.lock().store(category, update);
        if self.remove_on_write.load(Ordering::SeqCst) {
            self.mark_removed();
        }
        self.shared.record_changed(&self.uid);
        Ok(())
    }

    fn is_removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }
}

/// Aggregator holding contacts and records in memory
#[derive(Debug)]
pub struct InMemoryAggregator {
    primary_store: Option<String>,
    sources: Vec<SourceInfo>,
    contacts: Mutex<BTreeMap<ContactId, Vec<Arc<InMemoryRecord>>>>,
    shared: Arc<Shared>,
    creation_failure: Mutex<Option<String>>,
    link_failure: Mutex<Option<String>>,
    relink_to: Mutex<Option<ContactId>>,
}

impl InMemoryAggregator {
    /// Aggregator whose primary store is `primary_store`
    pub fn new(primary_store: &str) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            primary_store: Some(primary_store.to_string()),
            sources: vec![SourceInfo {
                id: primary_store.to_string(),
                display_name: primary_store.to_string(),
                writable: true,
                is_primary: true,
            }],
            contacts: Mutex::new(BTreeMap::new()),
            shared: Arc::new(Shared {
                journal: Mutex::new(Vec::new()),
                events,
                membership: Mutex::new(BTreeMap::new()),
            }),
            creation_failure: Mutex::new(None),
            link_failure: Mutex::new(None),
            relink_to: Mutex::new(None),
        }
    }

    /// With an extra store
    pub fn with_source(mut self, id: &str, writable: bool) -> Self {
        self.sources.push(SourceInfo {
            id: id.to_string(),
            display_name: id.to_string(),
            writable,
            is_primary: false,
        });
        self
    }

    /// Add a contact made of `seeds`, in order
    pub fn insert_contact(&self, id: &str, seeds: Vec<RecordSeed>) -> Vec<Arc<InMemoryRecord>> {
        let contact = ContactId::new(id);
        let records: Vec<Arc<InMemoryRecord>> = seeds.iter().map(|seed| self.materialize(seed)).collect();

        {
            let mut membership = self.shared.membership.lock();
            for record in &records {
                membership.insert(record.uid.clone(), contact.clone());
            }
        }
        self.contacts.lock().insert(contact.clone(), records.clone());
        self.shared.emit(AggregatorEvent::ContactAdded(contact));
        records
    }

    fn materialize(&self, seed: &RecordSeed) -> Arc<InMemoryRecord> {
        let uid = seed.uid.clone().unwrap_or_else(|| Ulid::new().to_string());
        let record = InMemoryRecord::new(uid, seed.store.clone(), seed.writable.clone(), Arc::clone(&self.shared));
        {
            let mut state = record.state.lock();
            for (category, update) in seed.updates() {
                state.store(category, update);
            }
        }
        Arc::new(record)
    }

    /// Record by uid, in any contact
    pub fn record(&self, uid: &str) -> Option<Arc<InMemoryRecord>> {
        self.contacts
            .lock()
            .values()
            .flatten()
            .find(|r| r.uid == uid)
            .cloned()
    }

    /// Records of a contact
    pub fn records_of(&self, id: &ContactId) -> Vec<Arc<InMemoryRecord>> {
        self.contacts.lock().get(id).cloned().unwrap_or_default()
    }

    /// Delete a record from its store
    pub fn remove_record(&self, uid: &str) -> bool {
        let Some(contact) = self.shared.membership.lock().remove(uid) else {
            return false;
        };
        let mut contacts = self.contacts.lock();
        let Some(records) = contacts.get_mut(&contact) else {
            return false;
        };
        if let Some(index) = records.iter().position(|r| r.uid == uid) {
            records.remove(index).mark_removed();
        }
        if records.is_empty() {
            contacts.remove(&contact);
            self.shared.emit(AggregatorEvent::ContactRemoved(contact));
        } else {
            self.shared.emit(AggregatorEvent::RecordsChanged(contact));
        }
        true
    }

    /// Delete a whole contact
    pub fn remove_contact(&self, id: &ContactId) -> bool {
        let Some(records) = self.contacts.lock().remove(id) else {
            return false;
        };
        let mut membership = self.shared.membership.lock();
        for record in records {
            membership.remove(&record.uid);
            record.mark_removed();
        }
        self.shared.emit(AggregatorEvent::ContactRemoved(id.clone()));
        true
    }

    /// Make the next record creation fail
    pub fn fail_creation(&self, message: &str) {
        *self.creation_failure.lock() = Some(message.to_string());
    }

    /// Make the next link fail
    pub fn fail_link(&self, message: &str) {
        *self.link_failure.lock() = Some(message.to_string());
    }

    /// Make the next link move the merged contact to `id`
    pub fn relink_next_to(&self, id: &str) {
        *self.relink_to.lock() = Some(ContactId::new(id));
    }

    /// Every call so far
    pub fn journal(&self) -> Vec<Operation> {
        self.shared.journal.lock().clone()
    }

    /// Forget recorded calls
    pub fn clear_journal(&self) {
        self.shared.journal.lock().clear();
    }

    /// `(record, category)` of every write attempt, in order
    pub fn writes(&self) -> Vec<(String, FieldCategory)> {
        self.journal()
            .into_iter()
            .filter_map(|op| match op {
                Operation::Write { record, category, .. } => Some((record, category)),
                _ => None,
            })
            .collect()
    }

    /// Number of records created
    pub fn create_count(&self) -> usize {
        self.journal()
            .iter()
            .filter(|op| matches!(op, Operation::Create { .. }))
            .count()
    }

    /// Number of links made
    pub fn link_count(&self) -> usize {
        self.journal()
            .iter()
            .filter(|op| matches!(op, Operation::Link { .. }))
            .count()
    }
}

#[async_trait]
impl Aggregator for InMemoryAggregator {
    fn contact_ids(&self) -> Vec<ContactId> {
        self.contacts.lock().keys().cloned().collect()
    }

    fn records(&self, contact: &ContactId) -> Option<Vec<RecordRef>> {
        self.contacts
            .lock()
            .get(contact)
            .map(|records| records.iter().map(|r| Arc::clone(r) as RecordRef).collect())
    }

    fn primary_store(&self) -> Option<String> {
        self.primary_store.clone()
    }

    fn sources(&self) -> Vec<SourceInfo> {
        self.sources.clone()
    }

    async fn create_record(
        &self,
        store: &str,
        initial: Vec<(FieldCategory, CategoryUpdate)>,
    ) -> Result<RecordRef, AggregatorError> {
        tokio::task::yield_now().await;

        if let Some(message) = self.creation_failure.lock().take() {
            return Err(AggregatorError::Creation(message));
        }
        if !self.sources.iter().any(|s| s.id == store && s.writable) {
            return Err(AggregatorError::StoreNotFound(store.to_string()));
        }

        let uid = Ulid::new().to_string();
        let record = InMemoryRecord::new(
            uid.clone(),
            store.to_string(),
            FieldCategory::ALL.to_vec(),
            Arc::clone(&self.shared),
        );
        let categories: Vec<FieldCategory> = initial.iter().map(|(c, _)| *c).collect();
        {
            let mut state = record.state.lock();
            for (category, update) in initial {
                state.store(category, update);
            }
        }
        let record = Arc::new(record);

        let contact = ContactId::new(Ulid::new().to_string());
        self.shared.membership.lock().insert(uid.clone(), contact.clone());
        self.contacts.lock().insert(contact.clone(), vec![Arc::clone(&record)]);
        self.shared.log(Operation::Create {
            store: store.to_string(),
            record: uid,
            categories,
        });
        self.shared.emit(AggregatorEvent::ContactAdded(contact));

        Ok(record)
    }

    async fn link(&self, records: Vec<RecordRef>) -> Result<ContactId, AggregatorError> {
        tokio::task::yield_now().await;

        if let Some(message) = self.link_failure.lock().take() {
            return Err(AggregatorError::Link(message));
        }

        let uids: Vec<String> = records.iter().map(|r| r.uid().to_string()).collect();
        let Some(target) = uids
            .first()
            .and_then(|uid| self.shared.membership.lock().get(uid).cloned())
        else {
            return Err(AggregatorError::Link("nothing to link".to_string()));
        };

        let mut emptied = Vec::new();
        let relinked = self.relink_to.lock().take();
        let contact = {
            let mut contacts = self.contacts.lock();
            let mut membership = self.shared.membership.lock();
            for uid in uids.iter().skip(1) {
                let Some(source) = membership.get(uid).cloned() else {
                    continue;
                };
                if source == target {
                    continue;
                }
                let moved = contacts.get_mut(&source).and_then(|list| {
                    list.iter()
                        .position(|r| &r.uid == uid)
                        .map(|index| list.remove(index))
                });
                if let Some(record) = moved {
                    contacts.entry(target.clone()).or_default().push(record);
                    membership.insert(uid.clone(), target.clone());
                }
                if contacts.get(&source).is_some_and(Vec::is_empty) {
                    contacts.remove(&source);
                    emptied.push(source);
                }
            }

            match relinked {
                Some(moved) if moved != target => {
                    let records = contacts.remove(&target).unwrap_or_default();
                    for record in &records {
                        membership.insert(record.uid.clone(), moved.clone());
                    }
                    contacts.insert(moved.clone(), records);
                    emptied.push(target);
                    moved
                }
                _ => target,
            }
        };

        self.shared.log(Operation::Link {
            records: uids,
            contact: contact.clone(),
        });
        for gone in emptied {
            self.shared.emit(AggregatorEvent::ContactRemoved(gone));
        }
        self.shared.emit(AggregatorEvent::RecordsChanged(contact.clone()));

        Ok(contact)
    }

    async fn flush(&self, store: &str) -> Result<(), AggregatorError> {
        tokio::task::yield_now().await;

        if !self.sources.iter().any(|s| s.id == store) {
            return Err(AggregatorError::StoreNotFound(store.to_string()));
        }
        self.shared.log(Operation::Flush {
            store: store.to_string(),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AggregatorEvent> {
        self.shared.events.subscribe()
    }
}
