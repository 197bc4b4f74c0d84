//! Expense command implementations

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use homemoney_core::db::Database;
use homemoney_core::models::NewExpense;
use homemoney_core::{ExpenseQuery, ExpenseQueryParams};

use super::truncate;

/// Filter flags shared by `expenses list` and `expenses stats`
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub month: Option<String>,
    pub expense_type: Option<String>,
    pub keyword: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

impl ExpenseFilter {
    fn to_query(&self) -> Result<ExpenseQuery> {
        let params = ExpenseQueryParams {
            month: self.month.clone(),
            expense_type: self.expense_type.clone(),
            keyword: self.keyword.clone(),
            sort: self.sort.clone(),
            limit: self.limit,
            page: self.page,
            ..Default::default()
        };
        Ok(ExpenseQuery::from_params(&params)?)
    }
}

/// Parse `--time`: RFC 3339, or a bare date at midnight UTC
pub fn parse_expense_time(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .context("Invalid --time format (use RFC 3339 or YYYY-MM-DD)")?;
    match date.and_hms_opt(0, 0, 0) {
        Some(dt) => Ok(dt.and_utc()),
        None => bail!("Invalid --time value: {}", raw),
    }
}

pub fn cmd_expenses_list(db: &Database, filter: &ExpenseFilter) -> Result<()> {
    let query = filter.to_query()?;
    let (expenses, total) = db.list_expenses(&query)?;

    if expenses.is_empty() {
        println!("No expenses found. Add one with:");
        println!("  homemoney expenses add --type groceries --amount 12.50");
        return Ok(());
    }

    println!();
    println!(
        "💸 Expenses (page {}, {} of {})",
        query.page(),
        expenses.len(),
        total
    );
    println!("   ─────────────────────────────────────────────────────────────");

    for e in &expenses {
        println!(
            "   {} │ {:16} │ {:>10.2} │ {:24} │ {}",
            e.time.format("%Y-%m-%d %H:%M"),
            truncate(&e.expense_type, 16),
            e.amount,
            truncate(e.remark.as_deref().unwrap_or(""), 24),
            e.id
        );
    }

    Ok(())
}

pub fn cmd_expenses_add(
    db: &Database,
    expense_type: &str,
    amount: f64,
    remark: Option<&str>,
    time: Option<&str>,
) -> Result<()> {
    let time = match time {
        Some(raw) => parse_expense_time(raw)?,
        None => Utc::now(),
    };

    let expense = db.create_expense(&NewExpense {
        expense_type: expense_type.to_string(),
        remark: remark.map(str::to_string),
        amount,
        time: Some(time),
    })?;

    println!(
        "✅ Recorded {} {:.2} on {} (ID: {})",
        expense.expense_type,
        expense.amount,
        expense.time.format("%Y-%m-%d"),
        expense.id
    );
    Ok(())
}

pub fn cmd_expenses_delete(db: &Database, id: &str) -> Result<()> {
    db.delete_expense(id)
        .with_context(|| format!("Failed to delete expense {}", id))?;
    println!("🗑️  Deleted expense {}", id);
    Ok(())
}

pub fn cmd_expenses_stats(db: &Database, filter: &ExpenseFilter, json: bool) -> Result<()> {
    let query = filter.to_query()?;
    let stats = db.expense_statistics(&query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!("📊 Expense Statistics");
    println!("   ─────────────────────────────");
    println!("   Records: {}", stats.count);
    println!("   Total:   {:.2}", stats.total_amount);
    println!("   Average: {:.2}", stats.average_amount);
    println!("   Median:  {:.2}", stats.median_amount);
    println!(
        "   Range:   {:.2} - {:.2}",
        stats.min_amount, stats.max_amount
    );

    if !stats.type_distribution.is_empty() {
        println!();
        println!("   By category:");
        for (name, slice) in &stats.type_distribution {
            println!(
                "   {:16} │ {:>4} │ {:>10.2} │ {:>3}%",
                truncate(name, 16),
                slice.count,
                slice.amount,
                slice.percentage
            );
        }
    }

    Ok(())
}
