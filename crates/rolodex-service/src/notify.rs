//! Change notifications
//!
//! Contact ids accumulate in added, removed and changed sets and are
//! emitted in batches once no new change arrived for the debounce period.
//! A batch goes out as `Updated`, then `Removed`, then `Added`; empty sets
//! are skipped.

use rolodex_model::ContactId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Kind of change in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    /// Contacts appeared
    Added,
    /// Contacts disappeared
    Removed,
    /// Contacts changed
    Updated,
}

/// One batch of changed contacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactChange {
    /// What happened
    pub kind: ChangeKind,
    /// Contacts it happened to
    pub ids: BTreeSet<ContactId>,
}

/// Receiver of change batches
#[cfg_attr(test, mockall::automock)]
pub trait ChangeSink: Send + Sync {
    /// Deliver one batch
    fn emit(&self, change: ContactChange);
}

/// Sink publishing batches on a broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<ContactChange>,
}

impl BroadcastSink {
    /// Sink with room for `capacity` undelivered batches per receiver
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Create a new subscriber
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ContactChange> {
        self.tx.subscribe()
    }
}

impl ChangeSink for BroadcastSink {
    fn emit(&self, change: ContactChange) {
        // No subscribers is fine
        let _ = self.tx.send(change);
    }
}

/// Changes not yet emitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    added: BTreeSet<ContactId>,
    removed: BTreeSet<ContactId>,
    changed: BTreeSet<ContactId>,
}

impl PendingChanges {
    /// Record a new contact; one pending removal turns into a change
    pub fn add(&mut self, id: ContactId) {
        if self.removed.remove(&id) {
            self.changed.insert(id);
        } else {
            self.added.insert(id);
        }
    }

    /// Record a removed contact; a pending addition is cancelled instead
    pub fn remove(&mut self, id: ContactId) {
        if self.added.remove(&id) {
            self.changed.remove(&id);
        } else {
            self.removed.insert(id);
        }
    }

    /// Record a changed contact
    pub fn change(&mut self, id: ContactId) {
        self.changed.insert(id);
    }

    /// True when nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Take every pending change as batches, in emission order
    pub fn drain(&mut self) -> Vec<ContactChange> {
        let added = std::mem::take(&mut self.added);
        let removed = std::mem::take(&mut self.removed);
        let changed: BTreeSet<ContactId> = std::mem::take(&mut self.changed)
            .into_iter()
            .filter(|id| !added.contains(id) && !removed.contains(id))
            .collect();

        [
            (ChangeKind::Updated, changed),
            (ChangeKind::Removed, removed),
            (ChangeKind::Added, added),
        ]
        .into_iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(kind, ids)| ContactChange { kind, ids })
        .collect()
    }

    /// Emit every pending change to `sink`; returns the number of batches
    pub fn flush(&mut self, sink: &dyn ChangeSink) -> usize {
        let batches = self.drain();
        let count = batches.len();
        for batch in batches {
            tracing::debug!(kind = ?batch.kind, contacts = batch.ids.len(), "emitting changes");
            sink.emit(batch);
        }
        count
    }
}

enum Command {
    Added(ContactId),
    Removed(ContactId),
    Changed(ContactId),
    Flush(oneshot::Sender<()>),
}

/// Debouncing notifier running on its own task
#[derive(Debug)]
pub struct ChangeNotifier {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl ChangeNotifier {
    /// Start the notifier task. Must be called within a Tokio runtime.
    #[must_use]
    pub fn spawn(sink: Arc<dyn ChangeSink>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx, sink, debounce));
        Self { tx, task }
    }

    /// A contact appeared
    pub fn added(&self, id: ContactId) {
        self.send(Command::Added(id));
    }

    /// A contact disappeared
    pub fn removed(&self, id: ContactId) {
        self.send(Command::Removed(id));
    }

    /// A contact changed
    pub fn changed(&self, id: ContactId) {
        self.send(Command::Changed(id));
    }

    /// Emit whatever is pending now, without waiting for the quiet period
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.send(Command::Flush(done));
        let _ = wait.await;
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            tracing::warn!("change notifier stopped, dropping change");
        }
    }
}

impl Drop for ChangeNotifier {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Command>, sink: Arc<dyn ChangeSink>, debounce: Duration) {
    let mut pending = PendingChanges::default();
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Added(id)) => pending.add(id),
                Some(Command::Removed(id)) => pending.remove(id),
                Some(Command::Changed(id)) => pending.change(id),
                Some(Command::Flush(done)) => {
                    pending.flush(sink.as_ref());
                    deadline = None;
                    let _ = done.send(());
                    continue;
                }
                None => {
                    pending.flush(sink.as_ref());
                    break;
                }
            },
            () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                pending.flush(sink.as_ref());
                deadline = None;
                continue;
            }
        }
        deadline = Some(Instant::now() + debounce);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;
    use tokio::sync::broadcast::error::TryRecvError;

    fn ids(names: &[&str]) -> BTreeSet<ContactId> {
        names.iter().map(|n| ContactId::new(*n)).collect()
    }

    fn batch(kind: ChangeKind, names: &[&str]) -> ContactChange {
        ContactChange {
            kind,
            ids: ids(names),
        }
    }

    #[test]
    fn flush_emits_updated_removed_added_in_order() {
        let mut pending = PendingChanges::default();
        pending.add("c3".into());
        pending.remove("c2".into());
        pending.change("c1".into());

        let mut sink = MockChangeSink::new();
        let mut seq = Sequence::new();
        for expected in [
            batch(ChangeKind::Updated, &["c1"]),
            batch(ChangeKind::Removed, &["c2"]),
            batch(ChangeKind::Added, &["c3"]),
        ] {
            sink.expect_emit()
                .with(eq(expected))
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }

        assert_eq!(pending.flush(&sink), 3);
        assert!(pending.is_empty());
    }

    #[test]
    fn add_after_remove_is_a_change() {
        let mut pending = PendingChanges::default();
        pending.remove("c".into());
        pending.add("c".into());
        assert_eq!(pending.drain(), vec![batch(ChangeKind::Updated, &["c"])]);
    }

    #[test]
    fn remove_after_add_cancels_both() {
        let mut pending = PendingChanges::default();
        pending.add("c".into());
        pending.change("c".into());
        pending.remove("c".into());

        let mut sink = MockChangeSink::new();
        sink.expect_emit().never();
        assert_eq!(pending.flush(&sink), 0);
    }

    #[test]
    fn changes_to_new_contacts_are_reported_as_added() {
        let mut pending = PendingChanges::default();
        pending.add("new".into());
        pending.change("new".into());
        pending.change("old".into());
        assert_eq!(
            pending.drain(),
            vec![
                batch(ChangeKind::Updated, &["old"]),
                batch(ChangeKind::Added, &["new"]),
            ]
        );
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn notifier_waits_for_quiet_period() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();
        let notifier = ChangeNotifier::spawn(Arc::new(sink), Duration::from_millis(500));

        notifier.changed("a".into());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        notifier.changed("b".into());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(rx.try_recv(), Ok(batch(ChangeKind::Updated, &["a", "b"])));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn explicit_flush_skips_the_wait() {
        let sink = BroadcastSink::new(8);
        let mut rx = sink.subscribe();
        let notifier = ChangeNotifier::spawn(Arc::new(sink), Duration::from_secs(60));

        notifier.added("a".into());
        notifier.flush().await;
        assert_eq!(rx.try_recv(), Ok(batch(ChangeKind::Added, &["a"])));
    }

    #[test]
    fn batches_serialize_with_kebab_kind() {
        let json = serde_json::to_value(batch(ChangeKind::Removed, &["x"])).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "removed", "ids": ["x"] }));
    }
}
