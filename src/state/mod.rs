//! State management module
//! 
//! This module contains the persisted timer record, the durable store that
//! owns it, and the shared state handed to the HTTP layer.

pub mod app_state;
pub mod backend;
pub mod snapshot;
pub mod store;

// Re-export main types
pub use app_state::AppState;
pub use backend::{JsonFileBackend, MemoryBackend, StorageBackend};
pub use snapshot::{format_remaining, Interval, Phase, Schedule, Snapshot, TimerConfig};
pub use store::ScheduleStore;
