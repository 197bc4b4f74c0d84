//! Error types for HomeMoney

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Invalid month format: {0} (expected YYYY-MM)")]
    InvalidMonthFormat(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Subscription plan not found: {0}")]
    PlanNotFound(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Subscription plan is inactive: {0}")]
    PlanInactive(String),

    #[error("Member {0} already has an active subscription")]
    DuplicateActiveSubscription(String),

    #[error("Subscription {0} is not active and cannot be renewed")]
    RenewNotAllowed(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Coarse classification of an [`Error`], used by callers to pick a response class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input, detected before any write
    Validation,
    /// A referenced member, plan, subscription or record does not exist
    NotFound,
    /// The request conflicts with current state
    StateConflict,
    /// Opaque failure from the store or filesystem
    Store,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSort(_)
            | Self::InvalidPagination(_)
            | Self::InvalidMonthFormat(_)
            | Self::InvalidRange(_)
            | Self::InvalidData(_)
            | Self::PlanInactive(_) => ErrorKind::Validation,
            Self::MemberNotFound(_)
            | Self::PlanNotFound(_)
            | Self::SubscriptionNotFound(_)
            | Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateActiveSubscription(_) | Self::RenewNotAllowed(_) | Self::Conflict(_) => {
                ErrorKind::StateConflict
            }
            Self::Database(_) | Self::Pool(_) | Self::Encryption(_) | Self::Io(_) | Self::Json(_) => {
                ErrorKind::Store
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::InvalidSort("bogus".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::PlanNotFound("p".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            Error::DuplicateActiveSubscription("alice".into()).kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            Error::Io(std::io::Error::other("disk")).kind(),
            ErrorKind::Store
        );
    }
}
