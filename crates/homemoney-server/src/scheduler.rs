//! Background scheduler for subscription sweeps
//!
//! Periodic sweeps are enabled via environment variable or CLI flag:
//!
//! - `HOMEMONEY_SWEEP_INTERVAL_MINUTES`: Interval in minutes between sweeps
//!
//! Each tick first extends overdue auto-renewing subscriptions, then expires
//! the overdue ones that remain.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::interval;
use tracing::{error, info, warn};

use homemoney_core::Database;

/// Environment variable that enables the sweep scheduler
pub const SWEEP_INTERVAL_ENV: &str = "HOMEMONEY_SWEEP_INTERVAL_MINUTES";

/// Longest sweep interval (one week)
pub const MAX_SWEEP_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Configuration for scheduled sweeps
#[derive(Debug, Clone)]
pub struct SweepScheduleConfig {
    /// Interval between sweeps in minutes
    pub interval_minutes: u64,
}

impl SweepScheduleConfig {
    /// Parse configuration from environment variables
    ///
    /// Returns None if scheduling is not configured
    pub fn from_env() -> Option<Self> {
        let interval_minutes: u64 = std::env::var(SWEEP_INTERVAL_ENV)
            .ok()
            .and_then(|s| s.parse().ok())?;
        Self::every(interval_minutes)
    }

    /// Schedule every `interval_minutes`; zero disables scheduling
    pub fn every(interval_minutes: u64) -> Option<Self> {
        if interval_minutes == 0 {
            warn!("Sweep interval is 0, scheduled sweeps disabled");
            return None;
        }
        if interval_minutes > MAX_SWEEP_INTERVAL_MINUTES {
            warn!(
                "Sweep interval {} exceeds {} minutes, capping",
                interval_minutes, MAX_SWEEP_INTERVAL_MINUTES
            );
            return Some(Self {
                interval_minutes: MAX_SWEEP_INTERVAL_MINUTES,
            });
        }
        Some(Self { interval_minutes })
    }
}

/// Counts from one sweep run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub renewed: usize,
    pub expired: usize,
}

/// Run one sweep: auto-renew first, then expire what is still overdue
pub fn run_sweep(db: &Database, now: DateTime<Utc>) -> homemoney_core::Result<SweepReport> {
    let renewed = db.auto_renew_subscriptions(now)?;
    let expired = db.expire_overdue_subscriptions(now)?;
    Ok(SweepReport { renewed, expired })
}

/// Start the sweep scheduler as a background task
pub fn start_sweep_scheduler(db: Database, config: SweepScheduleConfig) {
    info!(
        "Starting subscription sweep scheduler: every {} minutes",
        config.interval_minutes
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(
            config.interval_minutes.min(MAX_SWEEP_INTERVAL_MINUTES) * 60,
        ));

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match run_sweep(&db, Utc::now()) {
                Ok(report) => {
                    info!(
                        renewed = report.renewed,
                        expired = report.expired,
                        "Scheduled subscription sweep completed"
                    );
                }
                Err(e) => {
                    error!("Scheduled subscription sweep failed: {}", e);
                }
            }
        }
    });
}
