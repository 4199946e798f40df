pub mod carrier;
pub mod journal_state;
pub mod kills;
pub mod ledger;

pub use carrier::{BodyLocation, CarrierEffect, CarrierJumpState, CarrierJumpTracker, CooldownNotice};
pub use journal_state::{IndexedEvent, JournalState, Location};
pub use kills::{KillLog, KillRecord};
pub use ledger::MaterialLedger;
