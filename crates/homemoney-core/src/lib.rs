//! HomeMoney Core Library
//!
//! Shared functionality for the HomeMoney household finance backend:
//! - Database access and migrations
//! - Expense query validation and statistics
//! - Subscription lifecycle rules (create, cancel, renew, expire, auto-renew)
//! - File-backed JSON document store
//! - Client operation-log sink
//! - Payment gateway seam with a mock implementation

pub mod db;
pub mod error;
pub mod json_store;
pub mod lifecycle;
pub mod models;
pub mod operation_log;
pub mod payment;
pub mod query;
pub mod stats;

pub use db::Database;
pub use error::{Error, ErrorKind, Result};
pub use json_store::{JsonFileInfo, JsonFileStore};
pub use lifecycle::RenewPolicy;
pub use operation_log::{LogEntry, LogQuery, LogStats, StoredLog};
pub use payment::{MockGateway, PaymentConfig, PaymentGateway, PaymentService};
pub use query::{ExpenseQuery, ExpenseQueryParams};
