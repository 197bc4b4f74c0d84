//! Plan catalog command implementations

use anyhow::Result;
use homemoney_core::db::Database;
use homemoney_core::models::NewPlan;

use super::truncate;

pub fn cmd_plans_list(db: &Database) -> Result<()> {
    let plans = db.list_plans(false)?;

    if plans.is_empty() {
        println!("No plans yet. Add one with:");
        println!("  homemoney plans add --name Monthly --duration 30 --price 9.9");
        return Ok(());
    }

    println!();
    println!("📋 Subscription Plans");
    println!("   ─────────────────────────────────────────────────────────────");

    for plan in plans {
        let status_icon = if plan.is_active { "✅" } else { "⏸️ " };
        println!(
            "   {} {:20} │ {:>8.2}/{:<9} │ {:>4} days │ {}",
            status_icon,
            truncate(&plan.name, 20),
            plan.price,
            plan.period.as_str(),
            plan.duration,
            plan.id
        );
    }

    Ok(())
}

pub fn cmd_plans_add(
    db: &Database,
    name: &str,
    duration: i64,
    price: f64,
    period: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    let plan = db.create_plan(&NewPlan {
        name: name.to_string(),
        description: description.map(str::to_string),
        duration,
        price,
        period: period.map(str::to_string),
        is_active: None,
    })?;

    println!(
        "✅ Plan '{}' created ({} days at {:.2}, ID: {})",
        plan.name, plan.duration, plan.price, plan.id
    );
    Ok(())
}

pub fn cmd_plans_toggle(db: &Database, id: &str) -> Result<()> {
    let plan = db.toggle_plan_status(id)?;
    let state = if plan.is_active { "active" } else { "inactive" };
    println!("✅ Plan '{}' is now {}", plan.name, state);
    Ok(())
}
