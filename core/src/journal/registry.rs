//! Fan-out from commander discovery to per-commander journal watchers.
//!
//! The table maps each commander name to the file currently known for it
//! and the subscribers following it. Each subscriber gets its own
//! [`JournalWatcher`]; when a newer journal is detected for the commander,
//! every watcher is switched to it. The mutex guards only this table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::container::{ContainerSink, DetectedJournal};
use super::watcher::{JournalWatcher, WatchUpdate};
use crate::error::WatchError;

type SubscriberId = u64;

/// A subscriber whose watcher is running. The sender is kept so the
/// registry can still report to it after stopping the watcher.
struct ActiveSubscriber {
    id: SubscriberId,
    watcher: JournalWatcher,
    updates: mpsc::UnboundedSender<WatchUpdate>,
}

impl ActiveSubscriber {
    fn close(self, error: WatchError) {
        self.watcher.stop();
        let _ = self.updates.send(WatchUpdate::Error(error));
    }
}

struct CommanderBinding {
    path: Option<PathBuf>,
    /// Subscribers waiting for the commander's first journal.
    waiting: Vec<(SubscriberId, mpsc::UnboundedSender<WatchUpdate>)>,
    watchers: Vec<ActiveSubscriber>,
}

impl CommanderBinding {
    fn new() -> Self {
        Self {
            path: None,
            waiting: Vec::new(),
            watchers: Vec::new(),
        }
    }

    /// Follow `path` if it is newer than the journal already bound.
    /// Discovery can identify an older file late; that never moves the
    /// binding backwards.
    fn on_journal_change(&mut self, path: PathBuf, poll_interval: Duration) {
        if let Some(current) = &self.path {
            if path.file_name() <= current.file_name() {
                debug!(
                    path = %path.display(),
                    current = %current.display(),
                    "Ignoring journal not newer than the bound one"
                );
                return;
            }
        }

        for active in &self.watchers {
            if let Err(e) = active.watcher.switch_to(&path) {
                warn!(path = %path.display(), error = %e, "Failed to switch commander watcher");
            }
        }
        for (id, tx) in self.waiting.drain(..) {
            if let Some(active) = start_watcher(id, &path, poll_interval, tx) {
                self.watchers.push(active);
            }
        }
        self.path = Some(path);
    }

    fn subscribe(&mut self, id: SubscriberId, tx: mpsc::UnboundedSender<WatchUpdate>, poll_interval: Duration) {
        match &self.path {
            Some(path) => {
                if let Some(active) = start_watcher(id, path, poll_interval, tx) {
                    self.watchers.push(active);
                }
            }
            None => self.waiting.push((id, tx)),
        }
    }

    fn remove(&mut self, id: SubscriberId) {
        self.waiting.retain(|(waiting_id, _)| *waiting_id != id);
        if let Some(idx) = self.watchers.iter().position(|active| active.id == id) {
            self.watchers.remove(idx).watcher.stop();
        }
    }

    fn subscriber_count(&self) -> usize {
        self.waiting.len() + self.watchers.len()
    }
}

/// Spawn a watcher for one subscriber. Start failures are delivered on the
/// subscriber's own stream.
fn start_watcher(
    id: SubscriberId,
    path: &Path,
    poll_interval: Duration,
    tx: mpsc::UnboundedSender<WatchUpdate>,
) -> Option<ActiveSubscriber> {
    match JournalWatcher::spawn_file(path, poll_interval, tx.clone()) {
        Ok(watcher) => Some(ActiveSubscriber {
            id,
            watcher,
            updates: tx,
        }),
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to start commander watcher");
            let _ = tx.send(WatchUpdate::Error(e));
            None
        }
    }
}

#[derive(Default)]
struct RegistryState {
    bindings: HashMap<String, CommanderBinding>,
    next_id: SubscriberId,
}

/// Shared, cloneable handle to the commander table.
#[derive(Clone)]
pub struct CommanderRegistry {
    state: Arc<Mutex<RegistryState>>,
    poll_interval: Duration,
}

impl CommanderRegistry {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            poll_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Follow `commander`'s newest journal. Batches start flowing once a
    /// journal for the commander has been detected.
    pub fn subscribe(&self, commander: &str) -> CommanderSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;

        state
            .bindings
            .entry(commander.to_string())
            .or_insert_with(CommanderBinding::new)
            .subscribe(id, tx, self.poll_interval);
        debug!(commander, id, "Subscribed to commander journal");

        CommanderSubscription {
            commander: commander.to_string(),
            id,
            updates: rx,
            registry: self.clone(),
        }
    }

    /// File currently known for `commander`.
    pub fn journal_for(&self, commander: &str) -> Option<PathBuf> {
        self.lock().bindings.get(commander).and_then(|b| b.path.clone())
    }

    pub fn subscriber_count(&self, commander: &str) -> usize {
        self.lock()
            .bindings
            .get(commander)
            .map_or(0, CommanderBinding::subscriber_count)
    }

    fn remove(&self, commander: &str, id: SubscriberId) {
        if let Some(binding) = self.lock().bindings.get_mut(commander) {
            binding.remove(id);
        }
    }
}

impl ContainerSink for CommanderRegistry {
    fn on_journal_detected(&mut self, journal: DetectedJournal) {
        debug!(commander = %journal.commander, path = %journal.path.display(), "Commander journal detected");
        let poll_interval = self.poll_interval;
        self.lock()
            .bindings
            .entry(journal.commander)
            .or_insert_with(CommanderBinding::new)
            .on_journal_change(journal.path, poll_interval);
    }

    /// Discovery has stopped: end every subscriber's stream.
    fn on_error(&mut self, error: WatchError) {
        error!(error = %error, "Journal directory watch failed, closing commander streams");
        let mut state = self.lock();
        for binding in state.bindings.values_mut() {
            for (_, tx) in binding.waiting.drain(..) {
                let _ = tx.send(WatchUpdate::Error(WatchError::Closed));
            }
            for active in binding.watchers.drain(..) {
                active.close(WatchError::Closed);
            }
        }
    }
}

/// One subscriber's stream of batches. Dropping it stops its watcher.
pub struct CommanderSubscription {
    commander: String,
    id: SubscriberId,
    updates: mpsc::UnboundedReceiver<WatchUpdate>,
    registry: CommanderRegistry,
}

impl CommanderSubscription {
    pub fn commander(&self) -> &str {
        &self.commander
    }

    /// Next update, or `None` once the watch has ended.
    pub async fn recv(&mut self) -> Option<WatchUpdate> {
        self.updates.recv().await
    }
}

impl Drop for CommanderSubscription {
    fn drop(&mut self) {
        self.registry.remove(&self.commander, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBatch;
    use std::fs::OpenOptions;
    use std::io::Write;

    fn append(path: &Path, names: &[&str]) {
        let mut file = OpenOptions::new().create(true).append(true).open(path).unwrap();
        for name in names {
            writeln!(file, "{{\"timestamp\":\"2025-01-01T00:00:00Z\",\"event\":\"{name}\"}}").unwrap();
        }
    }

    async fn next_batch(sub: &mut CommanderSubscription) -> EventBatch {
        match tokio::time::timeout(Duration::from_secs(5), sub.recv()).await {
            Ok(Some(WatchUpdate::Batch(batch))) => batch,
            other => panic!("expected a batch, got {other:?}"),
        }
    }

    fn detected(commander: &str, path: &Path) -> DetectedJournal {
        DetectedJournal {
            commander: commander.to_string(),
            path: path.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_waits_for_detection() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("Journal.A.log");
        append(&a, &["a1"]);

        let mut registry = CommanderRegistry::new(Duration::from_millis(20));
        let mut sub = registry.subscribe("Jameson");
        assert_eq!(registry.journal_for("Jameson"), None);

        registry.on_journal_detected(detected("Jameson", &a));
        assert_eq!(registry.journal_for("Jameson"), Some(a.clone()));

        let batch = next_batch(&mut sub).await;
        assert!(!batch.live);
        assert_eq!(batch.events[0].event_name(), "a1");
    }

    #[tokio::test]
    async fn test_late_subscriber_starts_immediately_and_follows_switch() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("Journal.A.log");
        let b = dir.path().join("Journal.B.log");
        append(&a, &["a1"]);
        append(&b, &["b1"]);

        let mut registry = CommanderRegistry::new(Duration::from_millis(20));
        registry.on_journal_detected(detected("Jameson", &a));

        let mut sub = registry.subscribe("Jameson");
        assert_eq!(sub.commander(), "Jameson");
        assert_eq!(next_batch(&mut sub).await.events[0].event_name(), "a1");

        registry.on_journal_detected(detected("Jameson", &b));
        let batch = next_batch(&mut sub).await;
        assert!(!batch.live);
        assert_eq!(batch.events[0].event_name(), "b1");
    }

    #[tokio::test]
    async fn test_commanders_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("Journal.A.log");
        append(&a, &["a1"]);

        let mut registry = CommanderRegistry::new(Duration::from_millis(20));
        let _salome = registry.subscribe("Salome");
        registry.on_journal_detected(detected("Jameson", &a));

        assert_eq!(registry.journal_for("Salome"), None);
        assert_eq!(registry.subscriber_count("Salome"), 1);
        assert_eq!(registry.subscriber_count("Jameson"), 0);
    }

    #[tokio::test]
    async fn test_dropping_subscription_removes_it() {
        let registry = CommanderRegistry::new(Duration::from_millis(20));
        let sub = registry.subscribe("Jameson");
        let other = registry.subscribe("Jameson");
        assert_eq!(registry.subscriber_count("Jameson"), 2);

        drop(sub);
        assert_eq!(registry.subscriber_count("Jameson"), 1);
        drop(other);
        assert_eq!(registry.subscriber_count("Jameson"), 0);
    }

    #[tokio::test]
    async fn test_container_error_closes_waiting_streams() {
        let mut registry = CommanderRegistry::new(Duration::from_millis(20));
        let mut sub = registry.subscribe("Jameson");

        registry.on_error(WatchError::Closed);
        assert!(matches!(sub.recv().await, Some(WatchUpdate::Error(WatchError::Closed))));
        assert_eq!(registry.subscriber_count("Jameson"), 0);
    }

    #[tokio::test]
    async fn test_container_error_reaches_running_watchers() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("Journal.A.log");
        append(&a, &["a1"]);

        let mut registry = CommanderRegistry::new(Duration::from_millis(20));
        let mut sub = registry.subscribe("Jameson");
        registry.on_journal_detected(detected("Jameson", &a));
        assert_eq!(next_batch(&mut sub).await.events[0].event_name(), "a1");

        registry.on_error(WatchError::Closed);
        assert_eq!(registry.subscriber_count("Jameson"), 0);
        loop {
            match tokio::time::timeout(Duration::from_secs(5), sub.recv()).await {
                Ok(Some(WatchUpdate::Batch(_))) => continue,
                Ok(Some(WatchUpdate::Error(WatchError::Closed))) => break,
                other => panic!("expected the container error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_late_identified_older_journal_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let day1 = dir.path().join("Journal.2025-01-01T000000.01.log");
        let day2 = dir.path().join("Journal.2025-01-02T000000.01.log");
        let day3 = dir.path().join("Journal.2025-01-03T000000.01.log");
        append(&day1, &["d1"]);
        append(&day2, &["d2"]);
        append(&day3, &["d3"]);

        let mut registry = CommanderRegistry::new(Duration::from_millis(20));
        let mut sub = registry.subscribe("Jameson");
        registry.on_journal_detected(detected("Jameson", &day1));
        assert_eq!(next_batch(&mut sub).await.events[0].event_name(), "d1");

        registry.on_journal_detected(detected("Jameson", &day3));
        assert_eq!(next_batch(&mut sub).await.events[0].event_name(), "d3");

        registry.on_journal_detected(detected("Jameson", &day2));
        registry.on_journal_detected(detected("Jameson", &day3));
        assert_eq!(registry.journal_for("Jameson"), Some(day3.clone()));

        append(&day3, &["d3-live"]);
        let batch = next_batch(&mut sub).await;
        assert!(batch.live);
        assert_eq!(batch.events[0].event_name(), "d3-live");
    }
}
