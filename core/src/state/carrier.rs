//! Fleet carrier jump lifecycle.
//!
//! ```text
//!   Idle ──Request──► Scheduled ──Location(dest) / Jump──► Completed
//!    ▲                    │                                    │
//!    └─────Cancelled──────┴──────────────Request───────────────┘
//! ```
//!
//! The tracker is pure: it takes `now` as an argument and returns the side
//! effect it wants instead of performing it. The alerts layer owns the timer.

use chrono::{DateTime, Duration, Utc};
use elite_types::CarrierTimings;
use std::fmt;

use crate::events::{Event, JournalEvent};
use crate::game_data::ladder_position;

/// A system plus, when known, the body within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyLocation {
    pub system: String,
    pub body: Option<String>,
}

impl BodyLocation {
    pub fn new(system: impl Into<String>, body: Option<String>) -> Self {
        Self {
            system: system.into(),
            body,
        }
    }
}

/// Body (or system) name, with the booze-cruise ladder rung when the system
/// is on the ladder: `"HD 104785 A 1 [N9]"`.
impl fmt::Display for BodyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let place = self.body.as_deref().unwrap_or(&self.system);
        match ladder_position(&self.system) {
            Some(rung) => write!(f, "{place} [{rung}]"),
            None => f.write_str(place),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarrierJumpState {
    Scheduled {
        departure_time: DateTime<Utc>,
        destination: BodyLocation,
    },
    Completed {
        arrival_time: DateTime<Utc>,
        cooldown_end: DateTime<Utc>,
        destination: BodyLocation,
    },
}

/// A delayed notification the tracker wants fired at `at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownNotice {
    pub at: DateTime<Utc>,
    pub destination: BodyLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarrierEffect {
    /// Replace any pending notification with this one.
    Schedule(CooldownNotice),
    /// Drop any pending notification.
    Cancel,
}

#[derive(Debug, Clone)]
pub struct CarrierJumpTracker {
    timings: CarrierTimings,
    state: Option<CarrierJumpState>,
}

impl Default for CarrierJumpTracker {
    fn default() -> Self {
        Self::new(CarrierTimings::default())
    }
}

impl CarrierJumpTracker {
    pub fn new(timings: CarrierTimings) -> Self {
        Self {
            timings,
            state: None,
        }
    }

    /// `None` while idle.
    pub fn state(&self) -> Option<&CarrierJumpState> {
        self.state.as_ref()
    }

    /// Whether a completed jump's cooldown is still running at `now`.
    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        matches!(self.state, Some(CarrierJumpState::Completed { cooldown_end, .. }) if cooldown_end > now)
    }

    /// Fold one event into the state machine.
    pub fn apply(&mut self, event: &JournalEvent, now: DateTime<Utc>) -> Option<CarrierEffect> {
        match &event.event {
            Event::CarrierJumpRequest(details) => {
                self.state = Some(CarrierJumpState::Scheduled {
                    departure_time: details.departure_time,
                    destination: BodyLocation::new(&details.system, details.body.clone()),
                });
                Some(CarrierEffect::Cancel)
            }

            Event::CarrierLocation(details) => {
                let Some(CarrierJumpState::Scheduled {
                    departure_time,
                    destination,
                }) = &self.state
                else {
                    return None;
                };
                if destination.system != details.system {
                    return None;
                }
                let cooldown_end = *departure_time + self.jump_cooldown();
                let destination = destination.clone();
                self.complete(event.timestamp, cooldown_end, destination, now)
            }

            // Observed jumps may belong to another carrier; they still end
            // whatever this tracker was waiting on.
            Event::CarrierJump(details) => {
                let cooldown_end = match &self.state {
                    Some(CarrierJumpState::Scheduled { departure_time, .. }) => {
                        *departure_time + self.jump_cooldown()
                    }
                    _ => event.timestamp + self.fallback_cooldown(),
                };
                let destination = BodyLocation::new(&details.system, Some(details.body.clone()));
                self.complete(event.timestamp, cooldown_end, destination, now)
            }

            Event::CarrierJumpCancelled => {
                self.state = None;
                Some(CarrierEffect::Cancel)
            }

            _ => None,
        }
    }

    fn complete(
        &mut self,
        arrival_time: DateTime<Utc>,
        cooldown_end: DateTime<Utc>,
        destination: BodyLocation,
        now: DateTime<Utc>,
    ) -> Option<CarrierEffect> {
        self.state = Some(CarrierJumpState::Completed {
            arrival_time,
            cooldown_end,
            destination: destination.clone(),
        });
        (cooldown_end > now).then(|| {
            CarrierEffect::Schedule(CooldownNotice {
                at: cooldown_end,
                destination,
            })
        })
    }

    fn jump_cooldown(&self) -> Duration {
        Duration::seconds(self.timings.jump_cooldown_secs)
    }

    fn fallback_cooldown(&self) -> Duration {
        Duration::seconds(self.timings.fallback_cooldown_secs)
    }
}
