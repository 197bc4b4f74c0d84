//! Subscription lifecycle operations
//!
//! Every time-dependent operation takes `now` explicitly. Writes that read
//! state first run inside an IMMEDIATE transaction so concurrent callers
//! serialize on SQLite's write lock.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info, warn};

use super::plans::{row_to_plan_at, PLAN_COLUMNS};
use super::{format_timestamp, new_id, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::lifecycle::{self, RenewPolicy};
use crate::models::{NewSubscription, SubscriptionStatus, UserSubscription};

/// Subscription columns followed by the joined plan columns
fn select_sql(tail: &str) -> String {
    let plan_columns = PLAN_COLUMNS
        .split(", ")
        .map(|c| format!("p.{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
        SELECT s.id, s.member_id, s.plan_id, s.start_date, s.end_date, s.status,
               s.payment_id, s.auto_renew, s.created_at, s.updated_at, {}
        FROM user_subscriptions s
        LEFT JOIN subscription_plans p ON p.id = s.plan_id
        {}
        "#,
        plan_columns, tail
    )
}

fn row_to_subscription(row: &Row) -> rusqlite::Result<UserSubscription> {
    let start_date: String = row.get(3)?;
    let end_date: String = row.get(4)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    let joined_plan_id: Option<String> = row.get(10)?;

    let plan = match joined_plan_id {
        Some(_) => Some(row_to_plan_at(row, 10)?),
        None => None,
    };

    Ok(UserSubscription {
        id: row.get(0)?,
        member_id: row.get(1)?,
        plan_id: row.get(2)?,
        start_date: parse_datetime(&start_date),
        end_date: parse_datetime(&end_date),
        status: status.parse().unwrap_or(SubscriptionStatus::Expired),
        payment_id: row.get(6)?,
        auto_renew: row.get(7)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
        plan,
    })
}

fn find_subscription(conn: &Connection, id: &str) -> Result<Option<UserSubscription>> {
    let subscription = conn
        .query_row(&select_sql("WHERE s.id = ?"), params![id], row_to_subscription)
        .optional()?;
    Ok(subscription)
}

fn query_subscriptions(
    conn: &Connection,
    tail: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<UserSubscription>> {
    let mut stmt = conn.prepare(&select_sql(tail))?;
    let subscriptions = stmt
        .query_map(params, row_to_subscription)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(subscriptions)
}

impl Database {
    /// Create a subscription for a member
    ///
    /// Fails with `MemberNotFound`, `PlanNotFound`, `PlanInactive`, or
    /// `DuplicateActiveSubscription` when the member already holds an active
    /// subscription whose window contains `now`. The duplicate check and the
    /// insert share one IMMEDIATE transaction.
    pub fn create_subscription(
        &self,
        request: &NewSubscription,
        now: DateTime<Utc>,
    ) -> Result<UserSubscription> {
        let username = request.username.trim();
        if username.is_empty() {
            return Err(Error::InvalidData("username is required".into()));
        }
        if request.plan_id.trim().is_empty() {
            return Err(Error::InvalidData("planId is required".into()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let member_id: String = tx
            .query_row(
                "SELECT id FROM members WHERE username = ?",
                params![username],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::MemberNotFound(username.to_string()))?;

        let (duration, plan_active): (i64, bool) = tx
            .query_row(
                "SELECT duration, is_active FROM subscription_plans WHERE id = ?",
                params![request.plan_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| Error::PlanNotFound(request.plan_id.clone()))?;
        if !plan_active {
            return Err(Error::PlanInactive(request.plan_id.clone()));
        }

        let now_str = format_timestamp(now);
        let conflicting: i64 = tx.query_row(
            r#"
            SELECT COUNT(*) FROM user_subscriptions
            WHERE member_id = ? AND status = 'active' AND start_date <= ? AND end_date > ?
            "#,
            params![member_id, now_str, now_str],
            |row| row.get(0),
        )?;
        if conflicting > 0 {
            return Err(Error::DuplicateActiveSubscription(username.to_string()));
        }

        let (start, end) = lifecycle::initial_window(now, duration)?;
        let id = new_id();
        tx.execute(
            r#"
            INSERT INTO user_subscriptions
                (id, member_id, plan_id, start_date, end_date, status, payment_id, auto_renew, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'active', ?, ?, ?, ?)
            "#,
            params![
                id,
                member_id,
                request.plan_id,
                format_timestamp(start),
                format_timestamp(end),
                request.payment_id,
                request.auto_renew,
                now_str,
                now_str,
            ],
        )?;
        tx.commit()?;

        info!(subscription_id = %id, member = %username, "Subscription created");
        self.get_subscription(&id)?
            .ok_or_else(|| Error::SubscriptionNotFound(id.clone()))
    }

    /// Get a subscription by ID, with its plan
    pub fn get_subscription(&self, id: &str) -> Result<Option<UserSubscription>> {
        let conn = self.conn()?;
        find_subscription(&conn, id)
    }

    /// Cancel a subscription regardless of its current status
    pub fn cancel_subscription(&self, id: &str) -> Result<UserSubscription> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE user_subscriptions SET status = 'canceled', updated_at = ? WHERE id = ?",
            params![format_timestamp(Utc::now()), id],
        )?;
        if updated == 0 {
            return Err(Error::SubscriptionNotFound(id.to_string()));
        }

        find_subscription(&conn, id)?.ok_or_else(|| Error::SubscriptionNotFound(id.to_string()))
    }

    /// Extend a subscription by one plan duration from its previous end
    ///
    /// Status is forced back to `active`. Under [`RenewPolicy::ActiveOnly`]
    /// a canceled or expired subscription is rejected instead.
    pub fn renew_subscription(
        &self,
        id: &str,
        policy: RenewPolicy,
        now: DateTime<Utc>,
    ) -> Result<UserSubscription> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (plan_id, end_date, status): (String, String, String) = tx
            .query_row(
                "SELECT plan_id, end_date, status FROM user_subscriptions WHERE id = ?",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
            .ok_or_else(|| Error::SubscriptionNotFound(id.to_string()))?;

        let status: SubscriptionStatus = status.parse().map_err(Error::InvalidData)?;
        policy.check(id, status)?;

        let duration: i64 = tx
            .query_row(
                "SELECT duration FROM subscription_plans WHERE id = ?",
                params![plan_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::PlanNotFound(plan_id.clone()))?;

        let new_end = lifecycle::renewed_end(parse_datetime(&end_date), duration)?;
        tx.execute(
            "UPDATE user_subscriptions SET end_date = ?, status = 'active', updated_at = ? WHERE id = ?",
            params![format_timestamp(new_end), format_timestamp(now), id],
        )?;
        tx.commit()?;

        if status != SubscriptionStatus::Active {
            warn!(subscription_id = %id, previous_status = %status, "Renew reactivated a non-active subscription");
        }
        find_subscription(&conn, id)?.ok_or_else(|| Error::SubscriptionNotFound(id.to_string()))
    }

    /// Mark every active subscription whose end has passed as `expired`
    ///
    /// Returns the number of subscriptions transitioned.
    pub fn expire_overdue_subscriptions(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let now_str = format_timestamp(now);
        let expired = conn.execute(
            r#"
            UPDATE user_subscriptions SET status = 'expired', updated_at = ?
            WHERE status = 'active' AND end_date < ?
            "#,
            params![now_str, now_str],
        )?;
        if expired > 0 {
            info!(count = expired, "Expired overdue subscriptions");
        }
        Ok(expired)
    }

    /// Extend every overdue auto-renewing subscription by one plan duration
    ///
    /// Subscriptions whose plan no longer exists are skipped. Returns the
    /// number of subscriptions renewed.
    pub fn auto_renew_subscriptions(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now_str = format_timestamp(now);

        let due: Vec<(String, String, Option<i64>)> = {
            let mut stmt = tx.prepare(
                r#"
                SELECT s.id, s.end_date, p.duration
                FROM user_subscriptions s
                LEFT JOIN subscription_plans p ON p.id = s.plan_id
                WHERE s.status = 'active' AND s.auto_renew = 1 AND s.end_date < ?
                "#,
            )?;
            let rows = stmt
                .query_map(params![now_str], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let mut renewed = 0;
        for (id, end_date, duration) in due {
            let Some(duration) = duration else {
                warn!(subscription_id = %id, "Skipping auto-renew: plan no longer exists");
                continue;
            };
            let new_end = match lifecycle::renewed_end(parse_datetime(&end_date), duration) {
                Ok(end) => end,
                Err(e) => {
                    warn!(subscription_id = %id, "Skipping auto-renew: {}", e);
                    continue;
                }
            };
            tx.execute(
                "UPDATE user_subscriptions SET end_date = ?, status = 'active', updated_at = ? WHERE id = ?",
                params![format_timestamp(new_end), now_str, id],
            )?;
            debug!(subscription_id = %id, "Auto-renewed subscription");
            renewed += 1;
        }
        tx.commit()?;

        if renewed > 0 {
            info!(count = renewed, "Auto-renewed subscriptions");
        }
        Ok(renewed)
    }

    /// The member's subscription that is active with `start <= now <= end`
    ///
    /// If several match, the most recently created one wins.
    pub fn get_current_subscription(
        &self,
        member_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserSubscription>> {
        let conn = self.conn()?;
        let now_str = format_timestamp(now);
        let subscription = conn
            .query_row(
                &select_sql(
                    r#"
                    WHERE s.member_id = ? AND s.status = 'active'
                      AND s.start_date <= ? AND s.end_date >= ?
                    ORDER BY s.created_at DESC, s.id
                    LIMIT 1
                    "#,
                ),
                params![member_id, now_str, now_str],
                row_to_subscription,
            )
            .optional()?;
        Ok(subscription)
    }

    /// Subscription history for a member, newest first
    pub fn list_member_subscriptions(&self, member_id: &str) -> Result<Vec<UserSubscription>> {
        let conn = self.conn()?;
        query_subscriptions(
            &conn,
            "WHERE s.member_id = ? ORDER BY s.created_at DESC, s.id",
            params![member_id],
        )
    }

    /// Active subscriptions ending within `(now, now + days]`, soonest first
    pub fn get_expiring_subscriptions(
        &self,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserSubscription>> {
        lifecycle::check_days("days", days)?;
        let horizon = lifecycle::shift_days(now, days)?;
        let conn = self.conn()?;
        query_subscriptions(
            &conn,
            r#"
            WHERE s.status = 'active' AND s.end_date > ? AND s.end_date <= ?
            ORDER BY s.end_date ASC, s.id
            "#,
            params![format_timestamp(now), format_timestamp(horizon)],
        )
    }
}
