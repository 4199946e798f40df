//! The per-journal watch loop.
//!
//! Each watcher is one tokio task that owns its selector, tailer and frame
//! buffer. Filesystem notifications, poll ticks and switch requests all
//! arrive as [`WatchSignal`]s on a single channel and are handled strictly
//! in order, so nothing inside needs a lock.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use super::selector::{ActiveLogSelector, is_journal_file_name};
use super::tailer::LogTailer;
use crate::error::{WatchError, WatchResult};
use crate::events::EventBatch;

#[derive(Debug)]
pub enum WatchSignal {
    /// Directory contents changed (file created, removed or renamed).
    DirectoryChanged,
    /// A file in the watched directory was written to.
    FileChanged(PathBuf),
    /// Follow this file from now on.
    SwitchTo(PathBuf),
    /// Periodic read, backing up missed notifications.
    Poll,
    /// The notification backend failed.
    NotifyFailed(notify::Error),
}

/// Receives everything a watcher produces, on the watcher's own task.
pub trait BatchSink: Send + 'static {
    fn on_batch(&mut self, batch: EventBatch);

    /// A file- or directory-level failure. The watch has ended.
    fn on_error(&mut self, error: WatchError);
}

/// Watcher output as a message, for consumers that prefer a stream.
#[derive(Debug)]
pub enum WatchUpdate {
    Batch(EventBatch),
    Error(WatchError),
}

impl BatchSink for mpsc::UnboundedSender<WatchUpdate> {
    fn on_batch(&mut self, batch: EventBatch) {
        if self.send(WatchUpdate::Batch(batch)).is_err() {
            debug!("Batch receiver dropped");
        }
    }

    fn on_error(&mut self, error: WatchError) {
        if self.send(WatchUpdate::Error(error)).is_err() {
            debug!("Batch receiver dropped");
        }
    }
}

/// Signal handling for one watcher, independent of the async runtime.
#[derive(Debug)]
pub struct WatchCore {
    /// Present when following "whichever journal is newest".
    selector: Option<ActiveLogSelector>,
    initial: Option<PathBuf>,
    tailer: LogTailer,
}

impl WatchCore {
    /// Follow the newest journal in `directory`, switching on rotation.
    pub fn latest(directory: impl Into<PathBuf>) -> WatchResult<Self> {
        let directory = directory.into();
        let (selector, initial) =
            ActiveLogSelector::open(&directory).map_err(|e| WatchError::io(&directory, e))?;
        Ok(Self {
            initial: initial.map(|name| directory.join(name)),
            selector: Some(selector),
            tailer: LogTailer::new(),
        })
    }

    /// Follow exactly `path` until told to switch.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            selector: None,
            initial: Some(path.into()),
            tailer: LogTailer::new(),
        }
    }

    /// Directory the notification backend should watch.
    pub fn watch_root(&self) -> Option<PathBuf> {
        match &self.selector {
            Some(selector) => Some(selector.directory().to_path_buf()),
            None => self
                .initial
                .as_deref()
                .or(self.tailer.active_path())
                .and_then(Path::parent)
                .map(Path::to_path_buf),
        }
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.tailer.active_path()
    }

    /// Open the initial file, replaying its contents.
    pub fn start<S: BatchSink>(&mut self, sink: &mut S) -> WatchResult<()> {
        match self.initial.take() {
            Some(path) => self.switch(path, sink),
            None => Ok(()),
        }
    }

    pub fn handle_signal<S: BatchSink>(&mut self, signal: WatchSignal, sink: &mut S) -> WatchResult<()> {
        match signal {
            WatchSignal::DirectoryChanged => {
                self.rescan(sink)?;
                self.drain(sink)
            }
            WatchSignal::FileChanged(path) => {
                if self.tailer.active_path() == Some(path.as_path()) {
                    return self.drain(sink);
                }
                // A write to a journal we are not following yet can arrive
                // before its creation notification.
                let is_journal = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(is_journal_file_name);
                if is_journal {
                    self.rescan(sink)?;
                }
                Ok(())
            }
            WatchSignal::SwitchTo(path) => self.switch(path, sink),
            WatchSignal::Poll => {
                self.rescan(sink)?;
                self.drain(sink)
            }
            WatchSignal::NotifyFailed(e) => Err(WatchError::Notify(e)),
        }
    }

    fn rescan<S: BatchSink>(&mut self, sink: &mut S) -> WatchResult<()> {
        let Some(selector) = &mut self.selector else {
            return Ok(());
        };
        let changed = selector
            .on_directory_changed()
            .map_err(|e| WatchError::io(selector.directory(), e))?;
        match changed {
            Some(name) => {
                let path = selector.directory().join(name);
                self.switch(path, sink)
            }
            None => Ok(()),
        }
    }

    fn switch<S: BatchSink>(&mut self, path: PathBuf, sink: &mut S) -> WatchResult<()> {
        for batch in self.tailer.switch_to(path)? {
            emit(batch, sink);
        }
        Ok(())
    }

    fn drain<S: BatchSink>(&mut self, sink: &mut S) -> WatchResult<()> {
        if let Some(batch) = self.tailer.drain()? {
            emit(batch, sink);
        }
        Ok(())
    }
}

fn emit<S: BatchSink>(batch: EventBatch, sink: &mut S) {
    if !batch.is_empty() {
        sink.on_batch(batch);
    }
}

/// Handle to a running watcher task. Dropping it stops the watch and
/// releases its file and directory handles.
pub struct JournalWatcher {
    signals: mpsc::UnboundedSender<WatchSignal>,
    task: JoinHandle<()>,
}

impl JournalWatcher {
    /// Watch the newest journal in `directory`.
    pub fn spawn_latest<S: BatchSink>(
        directory: impl Into<PathBuf>,
        poll_interval: Duration,
        sink: S,
    ) -> WatchResult<Self> {
        Self::spawn(WatchCore::latest(directory)?, poll_interval, sink)
    }

    /// Watch one specific journal file.
    pub fn spawn_file<S: BatchSink>(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        sink: S,
    ) -> WatchResult<Self> {
        Self::spawn(WatchCore::file(path), poll_interval, sink)
    }

    fn spawn<S: BatchSink>(core: WatchCore, poll_interval: Duration, sink: S) -> WatchResult<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let fs_watcher = match core.watch_root() {
            Some(root) => Some(notify_watcher(&root, tx.clone())?),
            None => None,
        };

        let task = tokio::spawn(run(core, rx, sink, poll_interval, fs_watcher));
        Ok(Self { signals: tx, task })
    }

    /// Re-point this watcher at another file. Records still unread in the
    /// current file are delivered first.
    pub fn switch_to(&self, path: impl Into<PathBuf>) -> WatchResult<()> {
        self.signals
            .send(WatchSignal::SwitchTo(path.into()))
            .map_err(|_| WatchError::Closed)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the watch.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for JournalWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub(super) fn notify_watcher(
    root: &Path,
    tx: mpsc::UnboundedSender<WatchSignal>,
) -> WatchResult<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<NotifyEvent>| {
        let signals: Vec<WatchSignal> = match res {
            Ok(event) => translate(event),
            Err(e) => vec![WatchSignal::NotifyFailed(e)],
        };
        for signal in signals {
            // Receiver gone means the watcher task has ended.
            let _ = tx.send(signal);
        }
    })?;
    watcher.watch(root, RecursiveMode::NonRecursive)?;
    debug!(root = %root.display(), "Watching journal directory");
    Ok(watcher)
}

fn translate(event: NotifyEvent) -> Vec<WatchSignal> {
    match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
            vec![WatchSignal::DirectoryChanged]
        }
        EventKind::Modify(_) => event.paths.into_iter().map(WatchSignal::FileChanged).collect(),
        _ => Vec::new(),
    }
}

async fn run<S: BatchSink>(
    mut core: WatchCore,
    mut signals: mpsc::UnboundedReceiver<WatchSignal>,
    mut sink: S,
    poll_interval: Duration,
    _fs_watcher: Option<RecommendedWatcher>,
) {
    if let Err(e) = core.start(&mut sink) {
        error!(error = %e, "Journal watch failed to start");
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
            error!(error = %e, "Journal watch ended");
            sink.on_error(e);
            return;
        }
    }
    warn!("Journal watch signal channel closed");
}
