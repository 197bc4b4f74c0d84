//! Payment gateway seam and the mock gateway used in place of a real processor
//!
//! No network call is made. Orders get a generated `ORDER_<nanos>` id and
//! donations are appended as JSON lines to a local record file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};

/// Default merchant identity reported to the gateway
pub const DEFAULT_THIRD_PARTY_ID: &str = "HomeMoney";
pub const DEFAULT_THIRD_PARTY_NAME: &str = "HomeMoney Household Finance";

/// Merchant identity passed to the payment provider
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub third_party_id: String,
    pub third_party_name: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            third_party_id: DEFAULT_THIRD_PARTY_ID.to_string(),
            third_party_name: DEFAULT_THIRD_PARTY_NAME.to_string(),
        }
    }
}

impl PaymentConfig {
    /// Read `THIRD_PARTY_ID` and `THIRD_PARTY_NAME`, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            third_party_id: std::env::var("THIRD_PARTY_ID").unwrap_or(defaults.third_party_id),
            third_party_name: std::env::var("THIRD_PARTY_NAME")
                .unwrap_or(defaults.third_party_name),
        }
    }
}

/// What is sent to the gateway for one charge
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub username: String,
    pub amount: f64,
    pub third_party_id: String,
    pub third_party_name: String,
    pub description: String,
}

/// Something that can turn a payment request into an order id
pub trait PaymentGateway: Send + Sync {
    fn create_order(&self, request: &PaymentRequest) -> Result<String>;
}

/// Gateway stand-in that accepts every request
#[derive(Debug, Clone, Default)]
pub struct MockGateway;

impl PaymentGateway for MockGateway {
    fn create_order(&self, request: &PaymentRequest) -> Result<String> {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        info!(
            username = %request.username,
            amount = request.amount,
            "Mock payment order created"
        );
        Ok(format!("ORDER_{}", nanos))
    }
}

/// A completed donation, as appended to the record file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRecord {
    pub id: String,
    pub username: String,
    pub amount: f64,
    pub timestamp: String,
    pub order_id: String,
    pub status: String,
}

/// Order created for a plan purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeOrder {
    pub order_id: String,
    pub plan_id: String,
    pub plan_name: String,
    pub price: f64,
}

/// True when `amount` has at most two decimal places
fn has_cent_precision(amount: f64) -> bool {
    let cents = amount * 100.0;
    (cents - cents.round()).abs() < 1e-6
}

/// Donation and plan purchase flows on top of a gateway
pub struct PaymentService<G: PaymentGateway> {
    gateway: G,
    config: PaymentConfig,
}

impl<G: PaymentGateway> PaymentService<G> {
    pub fn new(gateway: G, config: PaymentConfig) -> Self {
        Self { gateway, config }
    }

    fn request(&self, username: &str, amount: f64, description: String) -> PaymentRequest {
        PaymentRequest {
            username: username.to_string(),
            amount,
            third_party_id: self.config.third_party_id.clone(),
            third_party_name: self.config.third_party_name.clone(),
            description,
        }
    }

    /// Charge a donation and return the record to persist
    pub fn donate(&self, username: &str, amount: f64) -> Result<DonationRecord> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidData("username is required".into()));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidData("amount must be greater than 0".into()));
        }
        if !has_cent_precision(amount) {
            return Err(Error::InvalidData(
                "amount must have at most two decimal places".into(),
            ));
        }

        let now = Utc::now();
        let description = format!("Donation by {} of {:.2}", username, amount);
        let order_id = self
            .gateway
            .create_order(&self.request(username, amount, description))?;

        Ok(DonationRecord {
            id: now.timestamp_nanos_opt().unwrap_or_default().to_string(),
            username: username.to_string(),
            amount,
            timestamp: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            order_id,
            status: "success".to_string(),
        })
    }

    /// Create an order for an active plan
    pub fn subscribe(&self, db: &Database, username: &str, plan_id: &str) -> Result<SubscribeOrder> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::InvalidData("username is required".into()));
        }
        let plan = db
            .get_plan(plan_id)?
            .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))?;
        if !plan.is_active {
            return Err(Error::PlanInactive(plan_id.to_string()));
        }

        let description = format!(
            "{} membership for {} ({}, {:.2})",
            plan.name, username, plan.period, plan.price
        );
        let order_id = self
            .gateway
            .create_order(&self.request(username, plan.price, description))?;

        Ok(SubscribeOrder {
            order_id,
            plan_id: plan.id,
            plan_name: plan.name,
            price: plan.price,
        })
    }
}

/// Append a donation record as one JSON line
pub fn append_donation_record(path: &Path, record: &DonationRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Location of the donation record file under a data directory
pub fn donation_records_path(data_dir: &Path) -> PathBuf {
    data_dir.join("donation_records.json")
}
