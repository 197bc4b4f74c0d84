//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db)
//! - `expenses` - Expense list, add, delete, stats
//! - `plans` - Plan catalog commands
//! - `serve` - Web server command
//! - `subscriptions` - Member subscription views and sweeps

pub mod core;
pub mod expenses;
pub mod plans;
pub mod serve;
pub mod subscriptions;

// Re-export command functions for main.rs
pub use core::*;
pub use expenses::*;
pub use plans::*;
pub use serve::*;
pub use subscriptions::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
