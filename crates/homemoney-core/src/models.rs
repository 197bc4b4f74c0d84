//! Domain models for HomeMoney

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single household expense record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    /// Category label, e.g. "groceries"
    #[serde(rename = "type")]
    pub expense_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    pub amount: f64,
    pub time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating or fully replacing an expense
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewExpense {
    #[serde(rename = "type", default)]
    pub expense_type: String,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

impl NewExpense {
    /// Check the record invariants: non-empty category, positive amount, timestamp present
    pub fn validate(&self) -> Result<()> {
        if self.expense_type.trim().is_empty() {
            return Err(Error::InvalidData("expense type is required".into()));
        }
        // Checked after rounding so nothing below one cent reaches the store
        if !self.amount.is_finite() || round_cents(self.amount) <= 0.0 {
            return Err(Error::InvalidData(
                "expense amount must be at least 0.01".into(),
            ));
        }
        if self.time.is_none() {
            return Err(Error::InvalidData("expense time is required".into()));
        }
        Ok(())
    }
}

/// Round an amount to two decimal places
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Distinct categories and months present in the expense table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseMeta {
    pub unique_types: Vec<String>,
    /// `YYYY-MM` tokens, newest first
    pub available_months: Vec<String>,
}

/// Aggregate over a filtered set of expenses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseStatistics {
    pub count: usize,
    pub total_amount: f64,
    pub average_amount: f64,
    pub median_amount: f64,
    pub min_amount: f64,
    pub max_amount: f64,
    pub type_distribution: BTreeMap<String, TypeDistribution>,
}

/// Per-category slice of [`ExpenseStatistics`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDistribution {
    pub count: usize,
    pub amount: f64,
    /// Share of the record count, rounded to the nearest integer
    pub percentage: i64,
}

/// Expense list ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortMode {
    DateAsc,
    #[default]
    DateDesc,
    AmountAsc,
    AmountDesc,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateAsc => "dateAsc",
            Self::DateDesc => "dateDesc",
            Self::AmountAsc => "amountAsc",
            Self::AmountDesc => "amountDesc",
        }
    }

    /// SQL ORDER BY body for this mode
    pub fn order_by(&self) -> &'static str {
        match self {
            Self::DateAsc => "time ASC",
            Self::DateDesc => "time DESC",
            Self::AmountAsc => "amount ASC",
            Self::AmountDesc => "amount DESC",
        }
    }
}

impl std::str::FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "dateAsc" => Ok(Self::DateAsc),
            "dateDesc" => Ok(Self::DateDesc),
            "amountAsc" => Ok(Self::AmountAsc),
            "amountDesc" => Ok(Self::AmountDesc),
            _ => Err(format!("Unknown sort mode: {}", s)),
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A household member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub username: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Billing period label for a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanPeriod {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl PlanPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for PlanPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(format!("Unknown plan period: {}", s)),
        }
    }
}

impl std::fmt::Display for PlanPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog entry a member can subscribe to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Length of one subscription window, in days
    pub duration: i64,
    pub price: f64,
    pub period: PlanPeriod,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating or updating a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlan {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewPlan {
    /// Validate and resolve the period label (defaults to monthly)
    pub fn validate(&self) -> Result<PlanPeriod> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidData("plan name is required".into()));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(Error::InvalidData("plan price must be greater than 0".into()));
        }
        crate::lifecycle::check_days("plan duration", self.duration)?;
        match self.period.as_deref().map(str::trim) {
            None | Some("") => Ok(PlanPeriod::default()),
            Some(p) => p.parse().map_err(Error::InvalidData),
        }
    }
}

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Unknown subscription status: {}", s)),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A member's subscription to a plan over a time window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubscription {
    pub id: String,
    pub member_id: String,
    pub plan_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: SubscriptionStatus,
    /// Order reference from the payment gateway
    pub payment_id: Option<String>,
    pub auto_renew: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Joined plan row; absent if the plan was deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<SubscriptionPlan>,
}

/// Request to subscribe a member to a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub plan_id: String,
    #[serde(default)]
    pub auto_renew: bool,
    #[serde(default)]
    pub payment_id: Option<String>,
}

/// A member together with its current subscription, if any
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberWithSubscription {
    #[serde(flatten)]
    pub member: Member,
    pub current_subscription: Option<UserSubscription>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_mode_parse() {
        assert_eq!("amountAsc".parse::<SortMode>().unwrap(), SortMode::AmountAsc);
        assert!("bogus".parse::<SortMode>().is_err());
        assert_eq!(SortMode::default(), SortMode::DateDesc);
    }

    #[test]
    fn test_new_expense_validation() {
        let mut expense = NewExpense {
            expense_type: "food".into(),
            remark: None,
            amount: 12.5,
            time: Some(Utc::now()),
        };
        assert!(expense.validate().is_ok());

        expense.amount = 0.0;
        assert!(matches!(expense.validate(), Err(Error::InvalidData(_))));

        expense.amount = 1.0;
        expense.expense_type = "  ".into();
        assert!(expense.validate().is_err());

        expense.expense_type = "food".into();
        expense.time = None;
        assert!(expense.validate().is_err());
    }

    #[test]
    fn test_new_plan_period_default() {
        let plan = NewPlan {
            name: "Basic".into(),
            duration: 30,
            price: 9.9,
            ..Default::default()
        };
        assert_eq!(plan.validate().unwrap(), PlanPeriod::Monthly);

        let plan = NewPlan {
            period: Some("weekly".into()),
            ..plan
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_expense_serializes_type_field() {
        let now = Utc::now();
        let expense = Expense {
            id: "e1".into(),
            expense_type: "rent".into(),
            remark: None,
            amount: 1000.0,
            time: now,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(json["type"], "rent");
        assert!(json.get("remark").is_none());
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(10.005_f64 + 0.0001), 10.01);
        assert_eq!(round_cents(3.14159), 3.14);
    }
}
