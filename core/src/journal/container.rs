//! Commander discovery across the whole journal directory.
//!
//! Every journal opens with a `Commander` record naming the player. The
//! container watcher reads each file only as far as that record, reports
//! which commander owns which file, and keeps files that have not written
//! it yet "provisional" so they are re-read as they grow.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use super::frame_buffer::FrameBuffer;
use super::selector::list_journals;
use super::watcher::{WatchSignal, notify_watcher};
use crate::error::{WatchError, WatchResult};
use crate::events::{commander_name, is_blank};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedJournal {
    pub commander: String,
    pub path: PathBuf,
}

/// Receives discovery results on the container watcher's task.
pub trait ContainerSink: Send + 'static {
    fn on_journal_detected(&mut self, journal: DetectedJournal);

    /// Directory-level failure. The container watch has ended.
    fn on_error(&mut self, error: WatchError);
}

/// A journal whose `Commander` record has not been seen yet.
#[derive(Debug)]
struct ProvisionalJournal {
    file: File,
    buffer: FrameBuffer,
}

#[derive(Debug)]
pub struct ContainerCore {
    directory: PathBuf,
    /// Newest journal name already accounted for.
    bookmark: Option<String>,
    provisional: HashMap<String, ProvisionalJournal>,
    /// Journal name to commander, for files already reported.
    identified: HashMap<String, String>,
}

impl ContainerCore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            bookmark: None,
            provisional: HashMap::new(),
            identified: HashMap::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Names of journals still waiting for their `Commander` record.
    pub fn provisional(&self) -> impl Iterator<Item = &str> {
        self.provisional.keys().map(String::as_str)
    }

    /// Initial scan, then search history for each requested commander.
    pub fn start<S: ContainerSink>(&mut self, requested: &[String], sink: &mut S) -> WatchResult<()> {
        self.scan_directory(sink)?;
        self.search_for_commanders(requested, sink)
    }

    pub fn handle_signal<S: ContainerSink>(&mut self, signal: WatchSignal, sink: &mut S) -> WatchResult<()> {
        match signal {
            WatchSignal::DirectoryChanged => self.scan_directory(sink),
            WatchSignal::FileChanged(path) => {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    self.provisional_changed(name, sink);
                }
                Ok(())
            }
            WatchSignal::Poll => {
                self.scan_directory(sink)?;
                let names: Vec<String> = self.provisional.keys().cloned().collect();
                for name in names {
                    self.provisional_changed(&name, sink);
                }
                Ok(())
            }
            WatchSignal::SwitchTo(path) => {
                debug!(path = %path.display(), "Ignoring switch request for container watch");
                Ok(())
            }
            WatchSignal::NotifyFailed(e) => Err(WatchError::Notify(e)),
        }
    }

    fn journals_newest_first(&self) -> WatchResult<Vec<String>> {
        let mut names = list_journals(&self.directory).map_err(|e| WatchError::io(&self.directory, e))?;
        names.reverse();
        Ok(names)
    }

    /// Every journal newer than the bookmark becomes provisional.
    pub fn scan_directory<S: ContainerSink>(&mut self, sink: &mut S) -> WatchResult<()> {
        debug!(directory = %self.directory.display(), "Scanning journal directory");
        let journals = self.journals_newest_first()?;

        let fresh: Vec<String> = match &self.bookmark {
            Some(bookmark) => journals.iter().take_while(|n| *n != bookmark).cloned().collect(),
            None => journals.first().cloned().into_iter().collect(),
        };
        if let Some(newest) = fresh.first() {
            self.bookmark = Some(newest.clone());
        } else if journals.is_empty() {
            self.bookmark = None;
        }

        for name in fresh {
            self.watch_provisional(&name);
            self.provisional_changed(&name, sink);
        }
        Ok(())
    }

    /// Walk history newest-first, reporting the newest journal of each
    /// requested commander. Files that cannot be identified yet are kept
    /// provisional.
    fn search_for_commanders<S: ContainerSink>(&mut self, requested: &[String], sink: &mut S) -> WatchResult<()> {
        let mut remaining: HashSet<&str> = requested.iter().map(String::as_str).collect();
        let mut shared = FrameBuffer::new();

        for name in self.journals_newest_first()? {
            if remaining.is_empty() {
                break;
            }
            if self.provisional.contains_key(&name) {
                continue;
            }
            if let Some(commander) = self.identified.get(&name) {
                remaining.remove(commander.as_str());
                continue;
            }
            match self.scan_file(&name, &mut shared) {
                Some(commander) => {
                    if !remaining.remove(commander.as_str()) {
                        debug!(journal = %name, commander = %commander, "Skipping already found commander");
                        continue;
                    }
                    debug!(journal = %name, commander = %commander, "Found journal for requested commander");
                    self.report(&name, commander, sink);
                }
                None => {
                    self.watch_provisional(&name);
                    self.provisional_changed(&name, sink);
                }
            }
        }
        Ok(())
    }

    /// Read `name` up to its `Commander` record.
    fn scan_file(&self, name: &str, shared: &mut FrameBuffer) -> Option<String> {
        let path = self.directory.join(name);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) => {
                warn!(journal = %name, error = %e, "Failed to open journal, will retry");
                return None;
            }
        };
        debug!(journal = %name, "Scanning journal file");

        shared.clear();
        match first_commander(&mut file, shared) {
            Ok(found) => found,
            Err(e) => {
                warn!(journal = %name, error = %e, "Error while scanning journal, will retry");
                None
            }
        }
    }

    fn watch_provisional(&mut self, name: &str) {
        if self.provisional.contains_key(name) || self.identified.contains_key(name) {
            return;
        }
        let path = self.directory.join(name);
        match File::open(&path) {
            Ok(file) => {
                debug!(journal = %name, "Watching provisional journal");
                self.provisional.insert(
                    name.to_string(),
                    ProvisionalJournal {
                        file,
                        buffer: FrameBuffer::new(),
                    },
                );
            }
            Err(e) => warn!(journal = %name, error = %e, "Failed to open journal, ignoring file"),
        }
    }

    /// Continue reading a provisional journal from where it stopped.
    fn provisional_changed<S: ContainerSink>(&mut self, name: &str, sink: &mut S) {
        let Some(journal) = self.provisional.get_mut(name) else {
            return;
        };
        let ProvisionalJournal { file, buffer } = journal;

        match first_commander(file, buffer) {
            Ok(Some(commander)) => {
                debug!(journal = %name, commander = %commander, "Identified journal file");
                self.report(name, commander, sink);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(journal = %name, error = %e, "Error reading journal, ignoring file");
                self.provisional.remove(name);
            }
        }
    }

    fn report<S: ContainerSink>(&mut self, name: &str, commander: String, sink: &mut S) {
        self.provisional.remove(name);
        self.identified.insert(name.to_string(), commander.clone());
        sink.on_journal_detected(DetectedJournal {
            commander,
            path: self.directory.join(name),
        });
    }
}

/// Records from `reader` until a `Commander` record or no more data.
fn first_commander<R: Read>(
    reader: &mut R,
    buffer: &mut FrameBuffer,
) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
    while let Some(record) = buffer.next_record(|buf| reader.read(buf))? {
        if is_blank(record) {
            continue;
        }
        if let Some(name) = commander_name(record)? {
            return Ok(Some(name));
        }
    }
    Ok(None)
}

/// Handle to a running container watch.
pub struct ContainerWatcher {
    task: JoinHandle<()>,
}

impl ContainerWatcher {
    pub fn spawn<S: ContainerSink>(
        directory: impl Into<PathBuf>,
        requested: Vec<String>,
        poll_interval: Duration,
        sink: S,
    ) -> WatchResult<Self> {
        let core = ContainerCore::new(directory);
        let (tx, rx) = mpsc::unbounded_channel();
        let fs_watcher = notify_watcher(core.directory(), tx)?;
        let task = tokio::spawn(run(core, requested, rx, sink, poll_interval, fs_watcher));
        Ok(Self { task })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for ContainerWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<S: ContainerSink>(
    mut core: ContainerCore,
    requested: Vec<String>,
    mut signals: mpsc::UnboundedReceiver<WatchSignal>,
    mut sink: S,
    poll_interval: Duration,
    _fs_watcher: RecommendedWatcher,
) {
    if let Err(e) = core.start(&requested, &mut sink) {
        error!(error = %e, "Container watch failed to start");
        sink.on_error(e);
        return;
    }

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let signal = tokio::select! {
            signal = signals.recv() => match signal {
                Some(signal) => signal,
                None => break,
            },
            _ = ticker.tick() => WatchSignal::Poll,
        };
        if let Err(e) = core.handle_signal(signal, &mut sink) {
            error!(error = %e, "Container watch ended");
            sink.on_error(e);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;

    #[derive(Default)]
    struct Collect {
        detected: Vec<DetectedJournal>,
        errors: Vec<WatchError>,
    }

    impl ContainerSink for Collect {
        fn on_journal_detected(&mut self, journal: DetectedJournal) {
            self.detected.push(journal);
        }

        fn on_error(&mut self, error: WatchError) {
            self.errors.push(error);
        }
    }

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new().create(true).append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn journal(dir: &Path, day: u32, commander: Option<&str>) -> PathBuf {
        let path = dir.join(format!("Journal.2025-01-{day:02}T000000.01.log"));
        append(
            &path,
            "{\"timestamp\":\"2025-01-01T00:00:00Z\",\"event\":\"Fileheader\",\"part\":1}\n",
        );
        if let Some(name) = commander {
            append(&path, &commander_line(name));
        }
        path
    }

    fn commander_line(name: &str) -> String {
        format!("{{\"timestamp\":\"2025-01-01T00:00:01Z\",\"event\":\"Commander\",\"FID\":\"F1\",\"Name\":\"{name}\"}}\n")
    }

    fn requested(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_search_reports_newest_journal_per_commander() {
        let dir = tempfile::tempdir().unwrap();
        journal(dir.path(), 1, Some("Jameson"));
        let salome = journal(dir.path(), 2, Some("Salome"));
        let jameson = journal(dir.path(), 3, Some("Jameson"));

        let mut sink = Collect::default();
        let mut core = ContainerCore::new(dir.path());
        core.start(&requested(&["Jameson", "Salome"]), &mut sink).unwrap();

        // The newest file is reported by the initial scan, then the search
        // skips Jameson's older journals.
        assert_eq!(
            sink.detected,
            vec![
                DetectedJournal {
                    commander: "Jameson".to_string(),
                    path: jameson
                },
                DetectedJournal {
                    commander: "Salome".to_string(),
                    path: salome
                },
            ]
        );
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn test_provisional_journal_detected_when_commander_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = Collect::default();
        let mut core = ContainerCore::new(dir.path());
        core.start(&[], &mut sink).unwrap();

        let path = journal(dir.path(), 1, None);
        core.handle_signal(WatchSignal::DirectoryChanged, &mut sink).unwrap();
        assert!(sink.detected.is_empty());
        assert_eq!(core.provisional().count(), 1);

        append(&path, &commander_line("Jameson"));
        core.handle_signal(WatchSignal::FileChanged(path.clone()), &mut sink).unwrap();

        assert_eq!(
            sink.detected,
            vec![DetectedJournal {
                commander: "Jameson".to_string(),
                path
            }]
        );
        assert_eq!(core.provisional().count(), 0);
    }

    #[test]
    fn test_new_journals_after_bookmark_become_provisional() {
        let dir = tempfile::tempdir().unwrap();
        journal(dir.path(), 1, Some("Jameson"));

        let mut sink = Collect::default();
        let mut core = ContainerCore::new(dir.path());
        core.start(&[], &mut sink).unwrap();
        assert_eq!(sink.detected.len(), 1);

        journal(dir.path(), 2, None);
        journal(dir.path(), 3, Some("Salome"));
        core.handle_signal(WatchSignal::Poll, &mut sink).unwrap();

        assert_eq!(sink.detected.len(), 2);
        assert_eq!(sink.detected[1].commander, "Salome");
        assert_eq!(
            core.provisional().collect::<Vec<_>>(),
            vec!["Journal.2025-01-02T000000.01.log"]
        );

        // Nothing new: the bookmark holds.
        core.handle_signal(WatchSignal::DirectoryChanged, &mut sink).unwrap();
        assert_eq!(sink.detected.len(), 2);
    }

    #[test]
    fn test_garbage_provisional_journal_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = Collect::default();
        let mut core = ContainerCore::new(dir.path());
        core.start(&[], &mut sink).unwrap();

        let path = dir.path().join("Journal.2025-01-01T000000.01.log");
        append(&path, "not json\n");
        core.handle_signal(WatchSignal::DirectoryChanged, &mut sink).unwrap();

        assert_eq!(core.provisional().count(), 0);
        assert!(sink.detected.is_empty());
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = Collect::default();
        let mut core = ContainerCore::new(dir.path().join("missing"));
        assert!(matches!(core.start(&[], &mut sink), Err(WatchError::Io { .. })));
    }
}
