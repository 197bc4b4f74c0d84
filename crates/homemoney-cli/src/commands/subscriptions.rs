//! Subscription command implementations

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use homemoney_core::db::Database;
use homemoney_core::lifecycle::{self, DEFAULT_EXPIRING_DAYS};
use homemoney_core::models::{Member, SubscriptionStatus, UserSubscription};

use super::truncate;

fn find_member(db: &Database, username: &str) -> Result<Member> {
    db.get_member_by_username(username)?
        .ok_or_else(|| anyhow!("Member not found: {}", username))
}

fn print_subscription(sub: &UserSubscription, now: DateTime<Utc>) {
    let status_icon = match sub.status {
        SubscriptionStatus::Active if lifecycle::is_overdue(sub, now) => "⌛",
        SubscriptionStatus::Active if lifecycle::is_expiring_within(sub, now, DEFAULT_EXPIRING_DAYS) => {
            "⚠️ "
        }
        SubscriptionStatus::Active => "✅",
        SubscriptionStatus::Canceled => "❌",
        SubscriptionStatus::Expired => "💤",
    };
    let plan_name = sub
        .plan
        .as_ref()
        .map(|p| p.name.as_str())
        .unwrap_or("(deleted plan)");

    println!(
        "   {} {:20} │ {} → {} │ {:8} │ {}{}",
        status_icon,
        truncate(plan_name, 20),
        sub.start_date.format("%Y-%m-%d"),
        sub.end_date.format("%Y-%m-%d"),
        sub.status.as_str(),
        sub.id,
        if sub.auto_renew { " (auto-renew)" } else { "" }
    );
}

pub fn cmd_subscriptions_list(db: &Database, username: &str) -> Result<()> {
    let member = find_member(db, username)?;
    let subscriptions = db.list_member_subscriptions(&member.id)?;

    if subscriptions.is_empty() {
        println!("{} has no subscriptions yet.", member.username);
        return Ok(());
    }

    let now = Utc::now();
    println!();
    println!("📋 Subscriptions for {}", member.username);
    println!("   ─────────────────────────────────────────────────────────────");
    for sub in &subscriptions {
        print_subscription(sub, now);
    }

    Ok(())
}

pub fn cmd_subscriptions_current(db: &Database, username: &str) -> Result<()> {
    let member = find_member(db, username)?;
    let now = Utc::now();

    match db.get_current_subscription(&member.id, now)? {
        Some(sub) => {
            println!("🎫 Current subscription for {}", member.username);
            print_subscription(&sub, now);
        }
        None => println!("{} has no current subscription.", member.username),
    }

    Ok(())
}

pub fn cmd_subscriptions_expiring(db: &Database, days: i64) -> Result<()> {
    let now = Utc::now();
    let subscriptions = db.get_expiring_subscriptions(days, now)?;

    if subscriptions.is_empty() {
        println!("No subscriptions end within {} days.", days);
        return Ok(());
    }

    println!();
    println!("⏳ Ending within {} days", days);
    println!("   ─────────────────────────────────────────────────────────────");
    for sub in &subscriptions {
        print_subscription(sub, now);
    }

    Ok(())
}

pub fn cmd_subscriptions_sweep(db: &Database) -> Result<()> {
    println!("🧹 Running subscription sweep...");
    let report = homemoney_server::run_sweep(db, Utc::now())?;
    println!("   Renewed: {}", report.renewed);
    println!("   Expired: {}", report.expired);
    println!("✅ Sweep complete");
    Ok(())
}
