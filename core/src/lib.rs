pub mod alerts;
pub mod error;
pub mod events;
pub mod game_data;
pub mod journal;
pub mod state;

// Re-exports for convenience
pub use alerts::{CooldownTimer, LogSink, NotificationSink};
pub use error::{DecodeError, WatchError, WatchResult};
pub use events::{Event, EventBatch, JournalEvent};
pub use journal::{BatchSink, CommanderRegistry, ContainerWatcher, JournalWatcher, WatchUpdate};
pub use state::{CarrierJumpTracker, JournalState};
