//! Pomodoro Keeper - a restart-safe Pomodoro timer daemon
//! 
//! This library provides a focus/break cycle tracker whose state lives
//! entirely in a durable store. Countdowns are kept as wall-clock deadlines,
//! so the timer stays correct across restarts, sleep and pauses.

pub mod config;
pub mod error;
pub mod state;
pub mod engine;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{EngineError, NotifyError, StoreError};
pub use state::{AppState, Interval, Phase, ScheduleStore, Snapshot, TimerConfig};
pub use engine::TimerEngine;
pub use services::Notifier;
pub use api::create_router;
pub use utils::signals::shutdown_signal;
