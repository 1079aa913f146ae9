//! Background tasks module
//! 
//! This module contains the background task that drives deadline expiry.

pub mod countdown;

// Re-export main types
pub use countdown::{countdown_task, Countdown};
