//! Journal file discovery, tailing and replay.
//!
//! ```text
//!   notify / poll ──► WatchSignal ──► watch task ──► ActiveLogSelector
//!                                         │                 │ current file
//!                                         ▼                 ▼
//!                                   LogTailer ◄──── switch_to(path)
//!                                         │
//!                                         └─► FrameBuffer ──► EventBatch ──► BatchSink
//! ```
//!
//! [`ContainerWatcher`] finds the newest journal per commander and feeds a
//! [`CommanderRegistry`], which keeps one [`JournalWatcher`] per subscriber.

pub mod container;
pub mod frame_buffer;
pub mod offline;
pub mod registry;
pub mod selector;
pub mod tailer;
pub mod watcher;

pub use container::{ContainerSink, ContainerWatcher, DetectedJournal};
pub use frame_buffer::FrameBuffer;
pub use offline::{OfflineSummary, replay_directory, replay_file};
pub use registry::{CommanderRegistry, CommanderSubscription};
pub use selector::{ActiveLogSelector, is_journal_file_name, list_journals};
pub use tailer::LogTailer;
pub use watcher::{BatchSink, JournalWatcher, WatchSignal, WatchUpdate};
