//! Delayed carrier cooldown notifications.
//!
//! The carrier tracker only asks for a notification; [`CooldownTimer`] owns
//! the single pending timer task and hands the message to a
//! [`NotificationSink`] when it fires. Sink failures are logged and dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::CarrierStatsDetails;
use crate::state::{BodyLocation, CarrierEffect};

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Fire-and-forget message delivery (push service, desktop toast, log).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), SinkError>;
}

/// Writes notifications to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, message: &str) -> Result<(), SinkError> {
        info!("{message}");
        Ok(())
    }
}

/// `"Carrier <name> <callsign> jump to <destination> complete"`.
pub fn cooldown_message(stats: Option<&CarrierStatsDetails>, destination: &BodyLocation) -> String {
    let carrier = match stats {
        Some(stats) => format!("{} {}", stats.name, stats.callsign),
        None => "Unknown Carrier".to_string(),
    };
    format!("Carrier {carrier} jump to {destination} complete")
}

/// At most one pending notification; scheduling a new one replaces it.
pub struct CooldownTimer {
    sink: Arc<dyn NotificationSink>,
    pending: Option<JoinHandle<()>>,
}

impl CooldownTimer {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            pending: None,
        }
    }

    /// Carry out a tracker effect. `stats` names the carrier in the message.
    pub fn apply(
        &mut self,
        effect: CarrierEffect,
        stats: Option<&CarrierStatsDetails>,
        now: DateTime<Utc>,
    ) {
        match effect {
            CarrierEffect::Schedule(notice) => {
                let message = cooldown_message(stats, &notice.destination);
                self.schedule(notice.at, now, message);
            }
            CarrierEffect::Cancel => self.cancel(),
        }
    }

    /// Deliver `message` at `fire_at`, cancelling whatever was pending.
    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, fire_at: DateTime<Utc>, now: DateTime<Utc>, message: String) {
        self.cancel();

        let delay = (fire_at - now).to_std().unwrap_or_default();
        info!(
            fire_at = %fire_at,
            delay_secs = delay.as_secs(),
            "Jump cooldown ends in the future, scheduling notification"
        );

        let sink = Arc::clone(&self.sink);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = sink.notify(&message).await {
                warn!(error = %e, "Notification delivery failed");
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            if !handle.is_finished() {
                debug!("Cancelling pending cooldown notification");
            }
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CooldownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
