//! Record decoding.
//!
//! Each record is parsed once into a `serde_json::Value`; the envelope
//! (`timestamp`, `event`) is read first and the discriminator then selects
//! which details struct the same value is deserialized into.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::journal_event::{Event, JournalEvent};
use crate::error::DecodeError;

#[derive(Deserialize)]
struct Envelope {
    timestamp: DateTime<Utc>,
    event: String,
}

/// Decode one newline-terminated record.
pub fn decode(record: &[u8]) -> Result<JournalEvent, DecodeError> {
    let text = std::str::from_utf8(record).map_err(|source| DecodeError::Utf8 {
        raw: lossy(record),
        source,
    })?;
    let value: Value =
        serde_json::from_str(text).map_err(|source| json_error(None, text, source))?;
    let envelope =
        Envelope::deserialize(&value).map_err(|source| json_error(None, text, source))?;

    match decode_body(&envelope.event, &value) {
        Ok(event) => Ok(JournalEvent {
            timestamp: envelope.timestamp,
            event,
        }),
        Err(source) => Err(json_error(Some(envelope.event), text, source)),
    }
}

fn decode_body(name: &str, value: &Value) -> Result<Event, serde_json::Error> {
    let event = match name {
        "Commander" => Event::Commander(details(value)?),
        "Docked" => Event::Docked(details(value)?),
        "Undocked" => Event::Undocked(details(value)?),
        "CarrierJumpRequest" => Event::CarrierJumpRequest(details(value)?),
        "CarrierJump" => Event::CarrierJump(details(value)?),
        "CarrierLocation" => Event::CarrierLocation(details(value)?),
        "CarrierStats" => Event::CarrierStats(details(value)?),
        "CarrierJumpCancelled" => Event::CarrierJumpCancelled,
        "Materials" => Event::Materials(details(value)?),
        "MaterialCollected" => Event::MaterialCollected(details(value)?),
        "MaterialTrade" => Event::MaterialTrade(details(value)?),
        "MissionCompleted" => Event::MissionCompleted(details(value)?),
        "EngineerCraft" => Event::EngineerCraft(details(value)?),
        "Bounty" => Event::Bounty(details(value)?),
        "ShipTargeted" => Event::ShipTargeted(details(value)?),
        other => Event::Unhandled(other.to_string()),
    };
    Ok(event)
}

fn details<'a, T: Deserialize<'a>>(value: &'a Value) -> Result<T, serde_json::Error> {
    T::deserialize(value)
}

/// Envelope-only probe for the `Commander` record that opens each journal.
/// Returns `Ok(None)` for any other discriminator without decoding its body.
pub fn commander_name(record: &[u8]) -> Result<Option<String>, DecodeError> {
    #[derive(Deserialize)]
    struct Probe {
        event: String,
        #[serde(rename = "Name", default)]
        name: Option<String>,
    }

    let probe: Probe = serde_json::from_slice(record).map_err(|source| DecodeError::Json {
        event: None,
        raw: lossy(record),
        source,
    })?;
    if probe.event != "Commander" {
        return Ok(None);
    }
    match probe.name {
        Some(name) => Ok(Some(name)),
        None => Err(DecodeError::Json {
            event: Some(probe.event),
            raw: lossy(record),
            source: serde::de::Error::missing_field("Name"),
        }),
    }
}

/// Whitespace-only lines carry no record.
pub fn is_blank(record: &[u8]) -> bool {
    record.iter().all(u8::is_ascii_whitespace)
}

fn json_error(event: Option<String>, text: &str, source: serde_json::Error) -> DecodeError {
    DecodeError::Json {
        event,
        raw: text.trim_end().to_string(),
        source,
    }
}

fn lossy(record: &[u8]) -> String {
    String::from_utf8_lossy(record).trim_end().to_string()
}

/// The events decoded by one drain of a journal, in file order.
#[derive(Debug, Default)]
pub struct EventBatch {
    pub events: Vec<JournalEvent>,
    /// `false` for the replay of content present when the file was opened.
    pub live: bool,
    pub errors: Vec<DecodeError>,
}

impl EventBatch {
    pub fn new(live: bool) -> Self {
        Self {
            events: Vec::new(),
            live,
            errors: Vec::new(),
        }
    }

    /// Decode `record` into this batch. Failures are logged and kept in
    /// `errors`; they never abort the batch.
    pub fn push_record(&mut self, record: &[u8]) {
        if is_blank(record) {
            return;
        }
        match decode(record) {
            Ok(event) => self.events.push(event),
            Err(e) => {
                warn!(error = %e, record = %e.raw(), "Skipping undecodable journal record");
                self.errors.push(e);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.errors.is_empty()
    }
}
