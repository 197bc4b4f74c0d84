//! Subscription lifecycle rules
//!
//! States are `active`, `canceled` and `expired`. The store layer applies these
//! rules inside its write paths; everything here is pure and takes `now`
//! explicitly.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};
use crate::models::{SubscriptionStatus, UserSubscription};

/// Default look-ahead window for expiring subscriptions
pub const DEFAULT_EXPIRING_DAYS: i64 = 7;

/// Longest accepted plan duration or day window (100 years)
pub const MAX_DAYS: i64 = 36_500;

/// Whether Renew may reactivate a subscription that is no longer active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenewPolicy {
    /// Renew any subscription and force it back to `active`
    #[default]
    AllowAny,
    /// Reject Renew for `canceled` or `expired` subscriptions
    ActiveOnly,
}

impl RenewPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowAny => "allow",
            Self::ActiveOnly => "active-only",
        }
    }

    /// Check whether a subscription with `status` may be renewed
    pub fn check(&self, subscription_id: &str, status: SubscriptionStatus) -> Result<()> {
        match (self, status) {
            (Self::ActiveOnly, SubscriptionStatus::Canceled | SubscriptionStatus::Expired) => {
                Err(Error::RenewNotAllowed(subscription_id.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl std::str::FromStr for RenewPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow" | "allow-any" | "any" => Ok(Self::AllowAny),
            "active-only" | "active_only" | "reject" => Ok(Self::ActiveOnly),
            _ => Err(format!("Unknown renew policy: {}", s)),
        }
    }
}

impl std::fmt::Display for RenewPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check a caller-supplied day count against `1..=MAX_DAYS`
pub fn check_days(what: &str, days: i64) -> Result<()> {
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(Error::InvalidData(format!(
            "{} must be between 1 and {}, got {}",
            what, MAX_DAYS, days
        )));
    }
    Ok(())
}

/// `at` shifted by `days` (negative moves back); fails instead of overflowing
pub fn shift_days(at: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|delta| at.checked_add_signed(delta))
        .ok_or_else(|| Error::InvalidData(format!("{} days from {} is out of range", days, at)))
}

/// Window for a new subscription starting at `start`
pub fn initial_window(
    start: DateTime<Utc>,
    duration_days: i64,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    Ok((start, shift_days(start, duration_days)?))
}

/// New end date after one renewal: the previous end plus one plan duration
pub fn renewed_end(previous_end: DateTime<Utc>, duration_days: i64) -> Result<DateTime<Utc>> {
    shift_days(previous_end, duration_days)
}

/// Active status and `start <= now <= end`
pub fn is_current(subscription: &UserSubscription, now: DateTime<Utc>) -> bool {
    subscription.status == SubscriptionStatus::Active
        && subscription.start_date <= now
        && now <= subscription.end_date
}

/// Active status and the end date has passed
pub fn is_overdue(subscription: &UserSubscription, now: DateTime<Utc>) -> bool {
    subscription.status == SubscriptionStatus::Active && subscription.end_date < now
}

/// Active and ending within `(now, now + days]`
pub fn is_expiring_within(subscription: &UserSubscription, now: DateTime<Utc>, days: i64) -> bool {
    subscription.status == SubscriptionStatus::Active
        && subscription.end_date > now
        && shift_days(now, days).map_or(true, |horizon| subscription.end_date <= horizon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn subscription(status: SubscriptionStatus, start: DateTime<Utc>, end: DateTime<Utc>) -> UserSubscription {
        UserSubscription {
            id: "s1".into(),
            member_id: "m1".into(),
            plan_id: "p1".into(),
            start_date: start,
            end_date: end,
            status,
            payment_id: None,
            auto_renew: false,
            created_at: start,
            updated_at: start,
            plan: None,
        }
    }

    #[test]
    fn test_initial_window_and_renewal() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let (s, e) = initial_window(start, 30).unwrap();
        assert_eq!(s, start);
        assert_eq!(e, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        assert_eq!(renewed_end(e, 30).unwrap(), Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_window_math_overflow_is_an_error() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        assert!(matches!(initial_window(start, 200_000_000), Err(Error::InvalidData(_))));
        assert!(matches!(renewed_end(start, i64::MAX / 2), Err(Error::InvalidData(_))));
        assert!(matches!(shift_days(start, i64::MIN), Err(Error::InvalidData(_))));

        let sub = subscription(SubscriptionStatus::Active, start, start + Duration::days(3));
        assert!(is_expiring_within(&sub, start, i64::MAX));
    }

    #[test]
    fn test_check_days_bounds() {
        assert!(check_days("days", 1).is_ok());
        assert!(check_days("days", MAX_DAYS).is_ok());
        assert!(check_days("days", 0).is_err());
        assert!(check_days("days", MAX_DAYS + 1).is_err());
    }

    #[test]
    fn test_is_current_bounds() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let sub = subscription(SubscriptionStatus::Active, start, end);
        assert!(is_current(&sub, start));
        assert!(is_current(&sub, end));
        assert!(!is_current(&sub, end + Duration::seconds(1)));

        let canceled = subscription(SubscriptionStatus::Canceled, start, end);
        assert!(!is_current(&canceled, start + Duration::days(1)));
    }

    #[test]
    fn test_overdue_and_expiring() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let past = subscription(SubscriptionStatus::Active, now - Duration::days(40), now - Duration::days(1));
        assert!(is_overdue(&past, now));
        assert!(!is_expiring_within(&past, now, 7));

        let soon = subscription(SubscriptionStatus::Active, now - Duration::days(20), now + Duration::days(7));
        assert!(!is_overdue(&soon, now));
        assert!(is_expiring_within(&soon, now, 7));
        assert!(!is_expiring_within(&soon, now, 6));
    }

    #[test]
    fn test_renew_policy() {
        assert!(RenewPolicy::AllowAny.check("s", SubscriptionStatus::Canceled).is_ok());
        assert!(RenewPolicy::ActiveOnly.check("s", SubscriptionStatus::Active).is_ok());
        assert!(matches!(
            RenewPolicy::ActiveOnly.check("s", SubscriptionStatus::Expired),
            Err(Error::RenewNotAllowed(_))
        ));
        assert_eq!("active-only".parse::<RenewPolicy>().unwrap(), RenewPolicy::ActiveOnly);
        assert!("sometimes".parse::<RenewPolicy>().is_err());
    }
}
