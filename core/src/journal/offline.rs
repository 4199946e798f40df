//! One-shot replay of every journal in a directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use memchr::memchr_iter;
use memmap2::Mmap;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::selector::list_journals;
use crate::error::{DecodeError, WatchError, WatchResult};
use crate::events::{decode, is_blank};

/// Aggregate counts from an offline replay.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OfflineSummary {
    pub files: usize,
    pub events: usize,
    pub decode_errors: usize,
    /// Event count per discriminator, `Unhandled` records under their raw name.
    pub counts: BTreeMap<String, usize>,
}

impl OfflineSummary {
    fn merge(mut self, other: OfflineSummary) -> OfflineSummary {
        self.files += other.files;
        self.events += other.events;
        self.decode_errors += other.decode_errors;
        for (name, count) in other.counts {
            *self.counts.entry(name).or_default() += count;
        }
        self
    }

    /// Discriminators ordered by descending count, then name.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<_> = self.counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked
    }
}

/// Record boundaries of a mapped file. A trailing unterminated record is
/// included, since nothing will append to it during an offline pass.
fn line_ranges(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for end in memchr_iter(b'\n', bytes) {
        if end > start {
            ranges.push((start, end));
        }
        start = end + 1;
    }
    if start < bytes.len() {
        ranges.push((start, bytes.len()));
    }
    ranges
}

/// Decode every record of one journal file.
pub fn replay_file(path: &Path) -> WatchResult<OfflineSummary> {
    let file = fs::File::open(path).map_err(|e| WatchError::io(path, e))?;
    // Journals are append-only; nothing truncates them while mapped.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| WatchError::io(path, e))?;
    let bytes = mmap.as_ref();

    let results: Vec<Result<String, DecodeError>> = line_ranges(bytes)
        .par_iter()
        .map(|&(start, end)| &bytes[start..end])
        .filter(|record| !is_blank(record))
        .map(|record| decode(record).map(|e| e.event_name().to_string()))
        .collect();

    let mut summary = OfflineSummary {
        files: 1,
        ..Default::default()
    };
    for result in results {
        match result {
            Ok(name) => {
                summary.events += 1;
                *summary.counts.entry(name).or_default() += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, raw = e.raw(), "Skipping undecodable record");
                summary.decode_errors += 1;
            }
        }
    }
    debug!(path = %path.display(), events = summary.events, "Replayed journal");
    Ok(summary)
}

/// Replay every `Journal.*.log` in `directory`, files in parallel.
pub fn replay_directory(directory: &Path) -> WatchResult<OfflineSummary> {
    let names = list_journals(directory).map_err(|e| WatchError::io(directory, e))?;
    let paths: Vec<PathBuf> = names.iter().map(|name| directory.join(name)).collect();
    info!(directory = %directory.display(), files = paths.len(), "Replaying all journals");

    paths
        .par_iter()
        .map(|path| replay_file(path))
        .try_reduce(OfflineSummary::default, |a, b| Ok(a.merge(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> String {
        format!("{{\"timestamp\":\"2025-01-01T00:00:00Z\",\"event\":\"{name}\"}}\n")
    }

    #[test]
    fn test_line_ranges_include_unterminated_tail() {
        let bytes = b"a\n\nbc\nd";
        assert_eq!(line_ranges(bytes), vec![(0, 1), (3, 5), (6, 7)]);
        assert!(line_ranges(b"").is_empty());
    }

    #[test]
    fn test_replay_directory_counts_all_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Journal.2025-01-01T000000.01.log"),
            record("Docked") + &record("Undocked") + "not json\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("Journal.2025-01-02T000000.01.log"),
            record("FSDJump") + "\n" + record("FSDJump").trim_end(),
        )
        .unwrap();
        fs::write(dir.path().join("Status.json"), record("Status")).unwrap();

        let summary = replay_directory(dir.path()).unwrap();
        assert_eq!(summary.files, 2);
        // Docked/Undocked lack their required fields.
        assert_eq!(summary.decode_errors, 3);
        assert_eq!(summary.events, 2);
        assert_eq!(summary.counts.get("FSDJump"), Some(&2));
        assert_eq!(summary.ranked(), vec![("FSDJump", 2)]);
    }

    #[test]
    fn test_ranked_orders_by_count_then_name() {
        let summary = OfflineSummary {
            counts: BTreeMap::from([
                ("Music".to_string(), 3),
                ("Bounty".to_string(), 5),
                ("Docked".to_string(), 3),
            ]),
            ..Default::default()
        };
        assert_eq!(summary.ranked(), vec![("Bounty", 5), ("Docked", 3), ("Music", 3)]);
    }

    #[test]
    fn test_missing_directory_is_watch_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = replay_directory(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, WatchError::Io { .. }));
    }
}
