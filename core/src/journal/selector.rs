//! Picks the "current" journal among a rotating set of files.
//!
//! Journal names embed a sortable timestamp (`Journal.2025-07-20T101500.01.log`),
//! so the lexicographically greatest matching name is the newest file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

pub const JOURNAL_PREFIX: &str = "Journal.";
pub const JOURNAL_SUFFIX: &str = ".log";

pub fn is_journal_file_name(name: &str) -> bool {
    name.len() > JOURNAL_PREFIX.len() + JOURNAL_SUFFIX.len()
        && name.starts_with(JOURNAL_PREFIX)
        && name.ends_with(JOURNAL_SUFFIX)
}

/// All journal file names in `dir`, oldest first.
pub fn list_journals(dir: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_journal_file_name(name))
        .collect();
    names.sort();
    Ok(names)
}

/// Tracks which journal in a directory is current and reports each
/// transition exactly once.
#[derive(Debug)]
pub struct ActiveLogSelector {
    directory: PathBuf,
    current: Option<String>,
}

impl ActiveLogSelector {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            current: None,
        }
    }

    /// Construct and perform the registration-time scan. The returned name
    /// is the initial "current file changed" if any journal exists.
    pub fn open(directory: impl Into<PathBuf>) -> io::Result<(Self, Option<String>)> {
        let mut selector = Self::new(directory);
        let initial = selector.on_directory_changed()?;
        Ok((selector, initial))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.current.as_ref().map(|name| self.directory.join(name))
    }

    /// The newest journal name currently on disk.
    pub fn scan(&self) -> io::Result<Option<String>> {
        Ok(list_journals(&self.directory)?.pop())
    }

    /// Re-scan after a directory notification. Returns the new current name
    /// when it differs from the recorded one. An empty directory keeps the
    /// last-known name rather than signalling a change to "nothing".
    pub fn on_directory_changed(&mut self) -> io::Result<Option<String>> {
        let Some(latest) = self.scan()? else {
            debug!(directory = %self.directory.display(), "No journal found, waiting for first journal");
            return Ok(None);
        };

        if self.current.as_deref() == Some(latest.as_str()) {
            return Ok(None);
        }

        debug!(journal = %latest, "Current journal changed");
        self.current = Some(latest.clone());
        Ok(Some(latest))
    }
}
