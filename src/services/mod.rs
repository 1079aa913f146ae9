//! External collaborators module
//! 
//! This module contains the alert/notification side of the timer: how phase
//! changes and countdown progress reach the user.

pub mod notifier;

// Re-export main types
pub use notifier::{CommandNotifier, LogNotifier, Notifier};
