//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod expenses;
pub mod health;
pub mod json_files;
pub mod logs;
pub mod maintenance;
pub mod members;
pub mod payments;
pub mod plans;
pub mod subscriptions;

// Re-export all handlers for use in router
pub use expenses::*;
pub use health::*;
pub use json_files::*;
pub use logs::*;
pub use maintenance::*;
pub use members::*;
pub use payments::*;
pub use plans::*;
pub use subscriptions::*;
