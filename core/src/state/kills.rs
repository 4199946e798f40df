use chrono::{DateTime, Duration, Utc};

use crate::events::BountyDetails;

/// One bounty-paying kill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillRecord {
    /// Position in the log.
    pub id: usize,
    pub timestamp: DateTime<Utc>,
    /// Time since the previous kill, `None` for the first.
    pub since_previous: Option<Duration>,
    pub pilot_name: String,
    pub ship: String,
    pub faction: String,
}

/// Append-only, ordered kill history.
#[derive(Debug, Clone, Default)]
pub struct KillLog {
    records: Vec<KillRecord>,
}

impl KillLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, timestamp: DateTime<Utc>, bounty: &BountyDetails) -> &KillRecord {
        let since_previous = self.records.last().map(|last| timestamp - last.timestamp);
        let id = self.records.len();
        self.records.push(KillRecord {
            id,
            timestamp,
            since_previous,
            pilot_name: bounty.display_pilot_name().to_string(),
            ship: bounty.target.clone(),
            faction: bounty.victim_faction.clone(),
        });
        &self.records[id]
    }

    pub fn records(&self) -> &[KillRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Mean interval between consecutive kills.
    pub fn average_interval(&self) -> Option<Duration> {
        let intervals: Vec<Duration> = self.records.iter().filter_map(|r| r.since_previous).collect();
        if intervals.is_empty() {
            return None;
        }
        let total: Duration = intervals.iter().copied().sum();
        Some(total / intervals.len() as i32)
    }
}
