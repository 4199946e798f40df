//! Follows one journal file at a time.
//!
//! The first drain after opening a file replays whatever it already held
//! (`live == false`); every later drain that reads bytes is live.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::frame_buffer::FrameBuffer;
use crate::error::{WatchError, WatchResult};
use crate::events::EventBatch;

/// The file currently being followed. Identity is its path.
#[derive(Debug)]
struct ActiveFile {
    path: PathBuf,
    file: File,
}

#[derive(Debug, Default)]
pub struct LogTailer {
    active: Option<ActiveFile>,
    buffer: FrameBuffer,
    /// Set on open, cleared by the first drain that reads any bytes.
    replay_pending: bool,
}

impl LogTailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.path.as_path())
    }

    /// Re-point the tailer at `path`.
    ///
    /// Records still unread in the old file are drained first, so a rotation
    /// never interleaves two files. The old descriptor is closed before the
    /// new one is opened. Returns the old file's final batch (if it had new
    /// records) followed by the new file's replay batch. Switching to the
    /// path already being followed does nothing.
    pub fn switch_to(&mut self, path: impl Into<PathBuf>) -> WatchResult<Vec<EventBatch>> {
        let path = path.into();
        if self.active_path() == Some(path.as_path()) {
            return Ok(Vec::new());
        }

        let mut batches = Vec::new();
        if let Some(batch) = self.drain()? {
            batches.push(batch);
        }
        if let Some(old) = self.active.take() {
            if self.buffer.retained() > 0 {
                debug!(
                    path = %old.path.display(),
                    bytes = self.buffer.retained(),
                    "Dropping unterminated trailing record"
                );
            }
            drop(old);
        }

        let file = File::open(&path).map_err(|e| WatchError::io(&path, e))?;
        info!(path = %path.display(), "Tailing journal");
        self.active = Some(ActiveFile { path, file });
        self.buffer.clear();
        self.replay_pending = true;

        if let Some(batch) = self.drain()? {
            batches.push(batch);
        }
        Ok(batches)
    }

    /// Read everything appended since the last drain. `None` when no file is
    /// open or no new bytes were available.
    pub fn drain(&mut self) -> WatchResult<Option<EventBatch>> {
        let Self {
            active,
            buffer,
            replay_pending,
        } = self;
        let Some(active) = active else {
            return Ok(None);
        };

        let mut batch = EventBatch::new(!*replay_pending);
        let read = buffer
            .fill_from(&mut active.file, |record| batch.push_record(record))
            .map_err(|e| WatchError::io(&active.path, e))?;
        if read == 0 {
            return Ok(None);
        }

        *replay_pending = false;
        debug!(
            path = %active.path.display(),
            bytes = read,
            events = batch.events.len(),
            live = batch.live,
            "Drained journal"
        );
        Ok(Some(batch))
    }

    /// Stop following the current file.
    pub fn close(&mut self) {
        self.active = None;
        self.buffer.clear();
        self.replay_pending = false;
    }
}
