//! Per-commander console monitor: prints live carrier activity and turns
//! completed jumps into delayed cooldown notifications.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use elite_core::alerts::{CooldownTimer, NotificationSink, SinkError};
use elite_core::events::{Event, EventBatch, JournalEvent};
use elite_core::game_data::ladder_position;
use elite_core::state::{BodyLocation, JournalState};
use elite_types::MonitorConfig;
use tracing::debug;

use crate::pushover::PushoverSink;

/// Prints `[name]: message` and forwards to Pushover when configured.
pub struct ConsoleSink {
    name: String,
    forward: Option<PushoverSink>,
}

impl ConsoleSink {
    pub fn new(name: impl Into<String>, forward: Option<PushoverSink>) -> Self {
        Self {
            name: name.into(),
            forward,
        }
    }
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn notify(&self, message: &str) -> Result<(), SinkError> {
        println!("[{}]: {message}", self.name);
        match &self.forward {
            Some(pushover) => pushover.notify(message).await,
            None => Ok(()),
        }
    }
}

pub struct CarrierMonitor {
    name: String,
    state: JournalState,
    timer: CooldownTimer,
}

impl CarrierMonitor {
    pub fn new(name: impl Into<String>, config: &MonitorConfig) -> Self {
        let name = name.into();
        let sink = ConsoleSink::new(name.clone(), config.pushover.as_ref().map(PushoverSink::new));
        Self::with_sink(name, config, Arc::new(sink))
    }

    pub fn with_sink(
        name: impl Into<String>,
        config: &MonitorConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            name: name.into(),
            state: JournalState::new(config.carrier),
            timer: CooldownTimer::new(sink),
        }
    }

    pub fn state(&self) -> &JournalState {
        &self.state
    }

    pub fn has_pending_notification(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn on_batch(&mut self, batch: EventBatch) {
        let now = Utc::now();
        let live = batch.live;
        for event in batch.events {
            self.on_event(event, live, now);
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn on_event(&mut self, event: JournalEvent, live: bool, now: DateTime<Utc>) {
        if live {
            debug!(monitor = %self.name, event = event.event_name(), "Live event");
            for line in self.live_lines(&event) {
                println!("[{}]: {line}", self.name);
            }
        }

        if let Some(effect) = self.state.apply(event, now) {
            self.timer.apply(effect, self.state.carrier_stats(), now);
        }
    }

    /// Console lines for a live event, computed against the state before it
    /// is applied.
    pub fn live_lines(&self, event: &JournalEvent) -> Vec<String> {
        match &event.event {
            Event::CarrierJumpRequest(details) => {
                let destination = BodyLocation::new(&details.system, details.body.clone());
                let departure = details.departure_time.timestamp();
                let mut lines = vec![format!(
                    "Carrier plotted to {destination}, departing at <t:{departure}:f> (<t:{departure}:R>)"
                )];

                let callsign = self.state.carrier_stats().map(|s| s.callsign.as_str());
                let from = self
                    .state
                    .carrier_location()
                    .and_then(|l| ladder_position(&l.system));
                let to = ladder_position(&details.system);
                if let (Some(callsign), Some(from), Some(to)) = (callsign, from, to) {
                    lines.push(format!(
                        "/wine_carrier_departure carrier_id:{callsign} departure_location:{from} arrival_location:{to}"
                    ));
                }
                lines
            }
            Event::CarrierJump(details) => {
                let arrived = BodyLocation::new(&details.system, Some(details.body.clone()));
                vec![format!("Carrier arrived in {arrived}")]
            }
            Event::CarrierJumpCancelled => vec!["Carrier jump cancelled".to_string()],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elite_core::events::decode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, message: &str) -> Result<(), SinkError> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    fn event(json: &str) -> JournalEvent {
        decode(json.as_bytes()).unwrap()
    }

    fn monitor(sink: Arc<RecordingSink>) -> CarrierMonitor {
        CarrierMonitor::with_sink("Jameson", &MonitorConfig::new("/tmp"), sink)
    }

    const STATS: &str = r#"{"timestamp":"2025-07-20T10:00:00Z","event":"CarrierStats","Name":"BOOZE HOUND","Callsign":"K7Q-B1Z","FuelLevel":500,"SpaceUsage":{"TotalCapacity":25000,"Crew":1020,"Cargo":0,"CargoSpaceReserved":0,"ShipPacks":0,"ModulePacks":0,"FreeSpace":23980}}"#;

    #[tokio::test]
    async fn test_request_lines_include_ladder_departure() {
        let mut monitor = monitor(Arc::new(RecordingSink::default()));
        let now = Utc::now();
        monitor.on_event(event(STATS), false, now);
        monitor.on_event(
            event(r#"{"timestamp":"2025-07-20T10:01:00Z","event":"CarrierLocation","StarSystem":"HD 105341"}"#),
            false,
            now,
        );

        let request = event(
            r#"{"timestamp":"2025-07-20T10:02:00Z","event":"CarrierJumpRequest","SystemName":"HD 104785","Body":"HD 104785 A 1","DepartureTime":"2025-07-20T10:17:00Z"}"#,
        );
        let lines = monitor.live_lines(&request);
        assert_eq!(
            lines,
            vec![
                "Carrier plotted to HD 104785 A 1 [N9], departing at <t:1753006620:f> (<t:1753006620:R>)"
                    .to_string(),
                "/wine_carrier_departure carrier_id:K7Q-B1Z departure_location:N1 arrival_location:N9"
                    .to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_request_off_ladder_has_single_line() {
        let monitor = monitor(Arc::new(RecordingSink::default()));
        let request = event(
            r#"{"timestamp":"2025-07-20T10:02:00Z","event":"CarrierJumpRequest","SystemName":"Sol","DepartureTime":"2025-07-20T10:17:00Z"}"#,
        );
        assert_eq!(monitor.live_lines(&request).len(), 1);
        assert!(monitor.live_lines(&event(r#"{"timestamp":"2025-07-20T10:02:00Z","event":"Music"}"#)).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_jump_notifies_after_cooldown() {
        let sink = Arc::new(RecordingSink::default());
        let mut monitor = monitor(sink.clone());
        let now: DateTime<Utc> = "2025-07-20T10:17:30Z".parse().unwrap();

        monitor.on_event(event(STATS), false, now);
        monitor.on_event(
            event(r#"{"timestamp":"2025-07-20T10:02:00Z","event":"CarrierJumpRequest","SystemName":"Sol","DepartureTime":"2025-07-20T10:17:00Z"}"#),
            true,
            now,
        );
        monitor.on_event(
            event(r#"{"timestamp":"2025-07-20T10:17:20Z","event":"CarrierJump","StarSystem":"Sol","Body":"Earth"}"#),
            true,
            now,
        );
        assert!(monitor.has_pending_notification());

        // Cooldown ends at departure + 290s, 260s after `now`.
        tokio::time::sleep(std::time::Duration::from_secs(261)).await;
        assert_eq!(
            *sink.messages.lock().unwrap(),
            vec!["Carrier BOOZE HOUND K7Q-B1Z jump to Earth complete".to_string()]
        );
    }

    #[tokio::test]
    async fn test_monitor_does_not_keep_event_log() {
        let mut monitor = monitor(Arc::new(RecordingSink::default()));
        let now = Utc::now();
        for _ in 0..100 {
            monitor.on_event(event(r#"{"timestamp":"2025-07-20T10:02:00Z","event":"Music"}"#), true, now);
        }
        assert!(!monitor.state().retains_events());
        assert!(monitor.state().events().is_empty());
        assert_eq!(monitor.state().applied(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replayed_old_jump_schedules_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let mut monitor = monitor(sink.clone());
        let now: DateTime<Utc> = "2025-07-21T00:00:00Z".parse().unwrap();

        monitor.on_event(
            event(r#"{"timestamp":"2025-07-20T10:17:20Z","event":"CarrierJump","StarSystem":"Sol","Body":"Earth"}"#),
            false,
            now,
        );
        assert!(!monitor.has_pending_notification());
        assert_eq!(
            monitor.state().carrier_location(),
            Some(&BodyLocation::new("Sol", Some("Earth".to_string())))
        );
    }
}
