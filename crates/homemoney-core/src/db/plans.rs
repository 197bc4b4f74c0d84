//! Subscription plan catalog operations

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, new_id, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewPlan, PlanPeriod, SubscriptionPlan};

pub(super) const PLAN_COLUMNS: &str =
    "id, name, description, duration, price, period, is_active, created_at, updated_at";

/// Map a plan row whose columns start at `offset`
pub(super) fn row_to_plan_at(row: &Row, offset: usize) -> rusqlite::Result<SubscriptionPlan> {
    let period: String = row.get(offset + 5)?;
    let created_at: String = row.get(offset + 7)?;
    let updated_at: String = row.get(offset + 8)?;
    Ok(SubscriptionPlan {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        description: row.get(offset + 2)?,
        duration: row.get(offset + 3)?,
        price: row.get(offset + 4)?,
        period: period.parse().unwrap_or(PlanPeriod::Monthly),
        is_active: row.get(offset + 6)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn row_to_plan(row: &Row) -> rusqlite::Result<SubscriptionPlan> {
    row_to_plan_at(row, 0)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Database {
    /// Create a plan; names are unique
    pub fn create_plan(&self, plan: &NewPlan) -> Result<SubscriptionPlan> {
        let period = plan.validate()?;
        let id = new_id();
        let now = format_timestamp(Utc::now());

        let conn = self.conn()?;
        let result = conn.execute(
            r#"
            INSERT INTO subscription_plans
                (id, name, description, duration, price, period, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                id,
                plan.name.trim(),
                plan.description.clone().unwrap_or_default(),
                plan.duration,
                plan.price,
                period.as_str(),
                plan.is_active.unwrap_or(true),
                now,
                now,
            ],
        );
        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::Conflict(format!(
                    "plan named '{}' already exists",
                    plan.name.trim()
                )))
            }
            Err(e) => return Err(e.into()),
        }

        self.get_plan(&id)?
            .ok_or_else(|| Error::PlanNotFound(id.clone()))
    }

    /// Get a plan by ID
    pub fn get_plan(&self, id: &str) -> Result<Option<SubscriptionPlan>> {
        let conn = self.conn()?;
        let plan = conn
            .query_row(
                &format!("SELECT {} FROM subscription_plans WHERE id = ?", PLAN_COLUMNS),
                params![id],
                row_to_plan,
            )
            .optional()?;
        Ok(plan)
    }

    /// List plans ordered by price, optionally only active ones
    pub fn list_plans(&self, active_only: bool) -> Result<Vec<SubscriptionPlan>> {
        let conn = self.conn()?;
        let sql = if active_only {
            format!(
                "SELECT {} FROM subscription_plans WHERE is_active = 1 ORDER BY price ASC, name",
                PLAN_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM subscription_plans ORDER BY price ASC, name",
                PLAN_COLUMNS
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let plans = stmt
            .query_map([], row_to_plan)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    /// Replace a plan's fields
    ///
    /// `is_active` is left untouched when not supplied.
    pub fn update_plan(&self, id: &str, plan: &NewPlan) -> Result<SubscriptionPlan> {
        let period = plan.validate()?;
        let conn = self.conn()?;
        let result = conn.execute(
            r#"
            UPDATE subscription_plans
            SET name = ?, description = ?, duration = ?, price = ?, period = ?,
                is_active = COALESCE(?, is_active), updated_at = ?
            WHERE id = ?
            "#,
            params![
                plan.name.trim(),
                plan.description.clone().unwrap_or_default(),
                plan.duration,
                plan.price,
                period.as_str(),
                plan.is_active,
                format_timestamp(Utc::now()),
                id,
            ],
        );
        match result {
            Ok(0) => return Err(Error::PlanNotFound(id.to_string())),
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::Conflict(format!(
                    "plan named '{}' already exists",
                    plan.name.trim()
                )))
            }
            Err(e) => return Err(e.into()),
        }

        self.get_plan(id)?
            .ok_or_else(|| Error::PlanNotFound(id.to_string()))
    }

    /// Flip a plan's active flag
    pub fn toggle_plan_status(&self, id: &str) -> Result<SubscriptionPlan> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE subscription_plans SET is_active = NOT is_active, updated_at = ? WHERE id = ?",
            params![format_timestamp(Utc::now()), id],
        )?;
        if updated == 0 {
            return Err(Error::PlanNotFound(id.to_string()));
        }

        self.get_plan(id)?
            .ok_or_else(|| Error::PlanNotFound(id.to_string()))
    }

    /// Delete a plan
    ///
    /// Existing subscriptions keep their dangling plan reference; renewing
    /// them afterwards fails with `PlanNotFound`.
    pub fn delete_plan(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM subscription_plans WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::PlanNotFound(id.to_string()));
        }
        Ok(())
    }
}
