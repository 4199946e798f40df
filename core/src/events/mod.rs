//! Journal event model and record decoder.
//!
//! ```text
//!   FrameBuffer record ──► decode() ──► JournalEvent { timestamp, Event }
//!                              │
//!                              └─► DecodeError (logged, kept in the batch)
//! ```

mod decode;
mod journal_event;


pub use decode::{EventBatch, commander_name, decode, is_blank};
pub use journal_event::*;
