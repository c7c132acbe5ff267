//! Pending update sessions
//!
//! A session reconciles one desired contact against the records of one
//! logical contact. Categories are visited in
//! [`FieldCategory::UPDATE_ORDER`]; each visit plans its steps, and the
//! driver loop awaits every step before taking the next one. Nothing runs
//! concurrently inside a session.
//!
//! The first failing step ends the session. Whatever happened, the contact
//! is rebuilt from the records' state at that point, under the id the last
//! link reported.
//!
//! Sessions for the same contact must not overlap: the session snapshots the
//! current contact when it is created and does not lock anything.

use crate::diff::{current_by_record, DiffContext};
use crate::error::SyncError;
use crate::fallback::CreationFallback;
use rolodex_model::{ContactId, Field, FieldCategory, LogicalContact};
use rolodex_store::{build, Aggregator, CategoryUpdate, RecordRef, RecordSet, StoreError};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::Instrument;

/// Where a session is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing issued yet
    Pending,
    /// Working through a category
    Reconciling(FieldCategory),
    /// Emptying field sets that no desired field replaced
    Clearing,
    /// Every step succeeded and the contact was rebuilt
    Completed,
    /// A step failed; later steps were dropped
    Failed,
}

impl SessionState {
    /// Check if the session has finished
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Replace a category's values on a record
    Write {
        /// Category
        category: FieldCategory,
        /// Record ordinal
        ordinal: usize,
        /// New values
        update: CategoryUpdate,
    },
    /// Create a record for a category some field cannot be written to,
    /// then link it
    Create {
        /// Category
        category: FieldCategory,
        /// The category's desired set, which the new record takes
        fields: Vec<Field>,
    },
}

/// Backend calls a session made
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Successful writes
    pub writes: usize,
    /// Records created and linked
    pub creates: usize,
}

/// Contact state read back after a session
#[derive(Debug, Clone)]
pub struct Rebuilt {
    /// Records, capability caches carried over
    pub records: RecordSet,
    /// Unified contact
    pub contact: LogicalContact,
}

/// Result of a finished session
#[derive(Debug)]
pub struct SessionOutcome {
    /// `Completed` or `Failed`
    pub state: SessionState,
    /// Contact id after the session; differs from the starting id when a
    /// link moved the records to another contact
    pub contact_id: ContactId,
    /// `Ok` or the first fatal error
    pub result: Result<(), SyncError>,
    /// Rebuilt contact; `None` if the contact no longer exists
    pub rebuilt: Option<Rebuilt>,
    /// Calls made
    pub stats: SessionStats,
}

/// Update session for one logical contact
pub struct UpdateSession {
    aggregator: Arc<dyn Aggregator>,
    contact_id: ContactId,
    records: RecordSet,
    current: LogicalContact,
    desired: LogicalContact,
    primary_store: Option<String>,
    state: SessionState,
    cursor: usize,
    queue: VecDeque<Step>,
    pending_removal: BTreeSet<(FieldCategory, usize)>,
    created: Vec<RecordRef>,
    stats: SessionStats,
}

impl UpdateSession {
    /// Session moving `current` (built from `records`) towards `desired`
    #[must_use]
    pub fn new(
        aggregator: Arc<dyn Aggregator>,
        records: RecordSet,
        current: LogicalContact,
        desired: LogicalContact,
    ) -> Self {
        let primary_store = aggregator.primary_store();
        let pending_removal = writable_field_sets(&current, &records);
        Self {
            aggregator,
            contact_id: current.id().clone(),
            records,
            current,
            desired,
            primary_store,
            state: SessionState::Pending,
            cursor: 0,
            queue: VecDeque::new(),
            pending_removal,
            created: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    /// With a primary store other than the aggregator's
    #[inline]
    #[must_use]
    pub fn with_primary_store(mut self, store: impl Into<String>) -> Self {
        self.primary_store = Some(store.into());
        self
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Contact being updated; follows the id a link returns
    #[inline]
    #[must_use]
    pub fn contact_id(&self) -> &ContactId {
        &self.contact_id
    }

    /// Drive the session to a terminal state
    pub async fn run(mut self) -> SessionOutcome {
        let span = tracing::info_span!("update_session", contact = %self.contact_id);
        async move {
            tracing::info!(records = self.records.len(), "update session started");

            let result = self.drive().await;
            let rebuilt = self.rebuild();

            self.state = match &result {
                Ok(()) => {
                    tracing::info!(
                        writes = self.stats.writes,
                        creates = self.stats.creates,
                        "update session completed"
                    );
                    SessionState::Completed
                }
                Err(error) => {
                    tracing::error!(%error, writes = self.stats.writes, "update session failed");
                    SessionState::Failed
                }
            };

            SessionOutcome {
                state: self.state,
                contact_id: self.contact_id,
                result,
                rebuilt,
                stats: self.stats,
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self) -> Result<(), SyncError> {
        while let Some(step) = self.next_step() {
            self.execute(step).await?;
        }
        Ok(())
    }

    /// Next backend call, planning categories until one needs a call
    fn next_step(&mut self) -> Option<Step> {
        loop {
            if let Some(step) = self.queue.pop_front() {
                return Some(step);
            }

            match self.state {
                SessionState::Pending | SessionState::Reconciling(_) => {
                    if let Some(&category) = FieldCategory::UPDATE_ORDER.get(self.cursor) {
                        self.cursor += 1;
                        self.state = SessionState::Reconciling(category);
                        let steps = self.plan_category(category);
                        self.queue.extend(steps);
                    } else {
                        self.state = SessionState::Clearing;
                        let steps = self.clearing_steps();
                        self.queue.extend(steps);
                    }
                }
                SessionState::Clearing | SessionState::Completed | SessionState::Failed => {
                    return None;
                }
            }
        }
    }

    fn plan_category(&mut self, category: FieldCategory) -> Vec<Step> {
        let context = DiffContext {
            desired: &self.desired,
            current: &self.current,
            records: &self.records,
            primary: self.primary_ordinal(),
        };
        let plan = context.plan(category);

        for ordinal in &plan.settled {
            self.pending_removal.remove(&(category, *ordinal));
        }
        if plan.is_noop() {
            tracing::trace!(%category, "no changes");
            return Vec::new();
        }

        if !plan.created.is_empty() {
            tracing::debug!(%category, fields = plan.created.len(), "category needs a new record");
            return vec![Step::Create {
                category,
                fields: plan.created,
            }];
        }

        let preferred = self.desired.preferred().get(category);
        let steps: Vec<Step> = plan
            .writes
            .into_iter()
            .map(|write| Step::Write {
                category,
                ordinal: write.ordinal,
                update: CategoryUpdate::from_fields(category, &write.fields, preferred),
            })
            .collect();

        tracing::debug!(%category, steps = steps.len(), "category changed");
        steps
    }

    /// Empty writes for field sets no category pass accounted for
    fn clearing_steps(&mut self) -> Vec<Step> {
        let pending = std::mem::take(&mut self.pending_removal);
        let mut steps = Vec::new();
        for category in FieldCategory::UPDATE_ORDER {
            for &(_, ordinal) in pending.iter().filter(|(c, _)| *c == category) {
                tracing::debug!(%category, ordinal, "clearing removed fields");
                steps.push(Step::Write {
                    category,
                    ordinal,
                    update: CategoryUpdate::empty_for(category),
                });
            }
        }
        steps
    }

    async fn execute(&mut self, step: Step) -> Result<(), SyncError> {
        match step {
            Step::Write {
                category,
                ordinal,
                update,
            } => self.write(category, ordinal, update).await,
            Step::Create { category, fields } => self.create(category, &fields).await,
        }
    }

    async fn write(
        &mut self,
        category: FieldCategory,
        ordinal: usize,
        update: CategoryUpdate,
    ) -> Result<(), SyncError> {
        let Some(handle) = self.records.get(ordinal) else {
            return Err(SyncError::UpdateFailed {
                record: format!("#{ordinal}"),
            });
        };
        if !handle.is_writable(category) {
            return Err(SyncError::CapabilityMismatch {
                record: handle.uid().to_string(),
                category,
            });
        }

        let record = Arc::clone(handle.record());
        let uid = record.uid().to_string();
        tracing::debug!(%category, record = %uid, values = update.len(), "writing");

        match record.write(category, update).await {
            Ok(()) if record.is_removed() => Err(SyncError::UpdateFailed { record: uid }),
            Ok(()) => {
                self.stats.writes += 1;
                Ok(())
            }
            Err(StoreError::RecordRemoved(record)) => Err(SyncError::UpdateFailed { record }),
            Err(error) => Err(SyncError::BackendWrite {
                category,
                record: uid,
                message: error.to_string(),
            }),
        }
    }

    async fn create(&mut self, category: FieldCategory, fields: &[Field]) -> Result<(), SyncError> {
        let Some(store) = self.primary_store.clone() else {
            return Err(SyncError::RecordCreation {
                category,
                message: "no primary store".to_string(),
            });
        };

        let mut members = self.records.records();
        members.extend(self.created.iter().cloned());

        let linked = CreationFallback::new(self.aggregator.as_ref(), &store)
            .create_record_for(members, category, fields, self.desired.preferred().get(category))
            .await?;

        if linked.contact != self.contact_id {
            tracing::info!(from = %self.contact_id, to = %linked.contact, "link moved contact");
            self.contact_id = linked.contact;
        }
        self.created.push(linked.record);
        self.stats.creates += 1;
        Ok(())
    }

    fn primary_ordinal(&self) -> Option<usize> {
        self.primary_store
            .as_deref()
            .and_then(|store| self.records.primary_ordinal(store))
    }

    /// Re-read the contact's records and build it again
    fn rebuild(&self) -> Option<Rebuilt> {
        let Some(records) = self.aggregator.records(&self.contact_id) else {
            tracing::warn!("contact disappeared during update");
            return None;
        };
        let records = self.records.refresh(records);
        let contact = build(&self.contact_id, &records);
        Some(Rebuilt { records, contact })
    }
}

/// `(category, ordinal)` pairs of current field sets on records that can
/// write them
fn writable_field_sets(contact: &LogicalContact, records: &RecordSet) -> BTreeSet<(FieldCategory, usize)> {
    let mut sets = BTreeSet::new();
    for category in FieldCategory::ALL {
        for ordinal in current_by_record(contact, category).into_keys() {
            if records.get(ordinal).is_some_and(|h| h.is_writable(category)) {
                sets.insert((category, ordinal));
            }
        }
    }
    sets
}
