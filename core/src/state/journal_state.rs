use chrono::{DateTime, Utc};
use elite_types::CarrierTimings;

use super::carrier::{BodyLocation, CarrierEffect, CarrierJumpState, CarrierJumpTracker};
use super::kills::KillLog;
use super::ledger::MaterialLedger;
use crate::events::{CarrierStatsDetails, Event, JournalEvent};

/// Where the commander last was, as far as the journal says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Docked { station: String, system: String },
    /// Left `station`; the system is carried over from the last dock.
    Undocked { station: String, system: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEvent {
    pub index: usize,
    pub event: JournalEvent,
}

/// Everything a front end shows, folded from one journal event stream.
///
/// Mutated only by [`JournalState::apply`], one event at a time, in file order.
/// The raw event log is kept only when enabled with [`JournalState::with_event_log`];
/// long-running consumers that never display it leave it off.
#[derive(Debug, Clone, Default)]
pub struct JournalState {
    events: Vec<IndexedEvent>,
    retain_events: bool,
    applied: usize,
    ledger: MaterialLedger,
    kills: KillLog,
    carrier: CarrierJumpTracker,
    carrier_stats: Option<CarrierStatsDetails>,
    carrier_location: Option<BodyLocation>,
    commander: Option<String>,
    location: Option<Location>,
}

impl JournalState {
    pub fn new(timings: CarrierTimings) -> Self {
        Self {
            carrier: CarrierJumpTracker::new(timings),
            ..Self::default()
        }
    }

    /// Keep every applied event for display.
    pub fn with_event_log(mut self) -> Self {
        self.retain_events = true;
        self
    }

    pub fn retains_events(&self) -> bool {
        self.retain_events
    }

    /// Events applied so far, whether or not they were retained.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Fold `event` into the state. Returns the notification change the
    /// carrier tracker requested, if any.
    pub fn apply(&mut self, event: JournalEvent, now: DateTime<Utc>) -> Option<CarrierEffect> {
        let was_scheduled = matches!(self.carrier.state(), Some(CarrierJumpState::Scheduled { .. }));
        let effect = self.carrier.apply(&event, now);
        self.ledger.apply(&event);

        match &event.event {
            Event::Commander(details) => self.commander = Some(details.name.clone()),
            Event::Docked(details) => {
                self.location = Some(Location::Docked {
                    station: details.station_name.clone(),
                    system: details.star_system.clone(),
                });
            }
            Event::Undocked(details) => {
                let system = match &self.location {
                    Some(Location::Docked { system, .. }) => Some(system.clone()),
                    Some(Location::Undocked { system, .. }) => system.clone(),
                    None => None,
                };
                self.location = Some(Location::Undocked {
                    station: details.station_name.clone(),
                    system,
                });
            }
            Event::CarrierStats(details) => self.carrier_stats = Some(details.clone()),
            Event::CarrierLocation(details) => {
                self.carrier_location = match self.carrier.state() {
                    Some(CarrierJumpState::Completed { destination, .. }) if was_scheduled => {
                        Some(destination.clone())
                    }
                    _ => Some(BodyLocation::new(&details.system, None)),
                };
            }
            Event::CarrierJump(details) => {
                self.carrier_location =
                    Some(BodyLocation::new(&details.system, Some(details.body.clone())));
            }
            Event::Bounty(details) => {
                self.kills.record(event.timestamp, details);
            }
            _ => {}
        }

        let index = self.applied;
        self.applied += 1;
        if self.retain_events {
            self.events.push(IndexedEvent { index, event });
        }
        effect
    }

    /// Empty unless the event log is enabled.
    pub fn events(&self) -> &[IndexedEvent] {
        &self.events
    }

    pub fn ledger(&self) -> &MaterialLedger {
        &self.ledger
    }

    pub fn kills(&self) -> &KillLog {
        &self.kills
    }

    pub fn carrier(&self) -> &CarrierJumpTracker {
        &self.carrier
    }

    pub fn carrier_jump(&self) -> Option<&CarrierJumpState> {
        self.carrier.state()
    }

    pub fn carrier_stats(&self) -> Option<&CarrierStatsDetails> {
        self.carrier_stats.as_ref()
    }

    pub fn carrier_location(&self) -> Option<&BodyLocation> {
        self.carrier_location.as_ref()
    }

    pub fn commander(&self) -> Option<&str> {
        self.commander.as_deref()
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}
