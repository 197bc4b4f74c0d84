//! Member operations

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, new_id, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Member, MemberWithSubscription};

const MEMBER_COLUMNS: &str = "id, username, is_active, created_at, updated_at";

fn row_to_member(row: &Row) -> rusqlite::Result<Member> {
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;
    Ok(Member {
        id: row.get(0)?,
        username: row.get(1)?,
        is_active: row.get(2)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn validate_username(username: &str) -> Result<&str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::InvalidData("username is required".into()));
    }
    Ok(username)
}

impl Database {
    /// Get a member by username, creating an inactive one if missing
    ///
    /// Concurrent first access is safe: the UNIQUE username constraint makes
    /// the losing insert a no-op and both callers read back the same row.
    pub fn get_or_create_member(&self, username: &str) -> Result<Member> {
        let username = validate_username(username)?;
        let now = format_timestamp(Utc::now());

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO members (id, username, is_active, created_at, updated_at)
            VALUES (?, ?, 0, ?, ?)
            ON CONFLICT(username) DO NOTHING
            "#,
            params![new_id(), username, now, now],
        )?;

        let member = conn.query_row(
            &format!("SELECT {} FROM members WHERE username = ?", MEMBER_COLUMNS),
            params![username],
            row_to_member,
        )?;
        Ok(member)
    }

    /// Get a member by username
    pub fn get_member_by_username(&self, username: &str) -> Result<Option<Member>> {
        let conn = self.conn()?;
        let member = conn
            .query_row(
                &format!("SELECT {} FROM members WHERE username = ?", MEMBER_COLUMNS),
                params![username.trim()],
                row_to_member,
            )
            .optional()?;
        Ok(member)
    }

    /// Get a member by ID
    pub fn get_member(&self, id: &str) -> Result<Option<Member>> {
        let conn = self.conn()?;
        let member = conn
            .query_row(
                &format!("SELECT {} FROM members WHERE id = ?", MEMBER_COLUMNS),
                params![id],
                row_to_member,
            )
            .optional()?;
        Ok(member)
    }

    /// List all members, newest first
    pub fn list_members(&self) -> Result<Vec<Member>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM members ORDER BY created_at DESC, username",
            MEMBER_COLUMNS
        ))?;
        let members = stmt
            .query_map([], row_to_member)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(members)
    }

    /// Set a member's active flag
    pub fn update_member_status(&self, username: &str, is_active: bool) -> Result<Member> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE members SET is_active = ?, updated_at = ? WHERE username = ?",
            params![is_active, format_timestamp(Utc::now()), username.trim()],
        )?;
        if updated == 0 {
            return Err(Error::MemberNotFound(username.to_string()));
        }

        self.get_member_by_username(username)?
            .ok_or_else(|| Error::MemberNotFound(username.to_string()))
    }

    /// Member joined with its current subscription, if the member exists
    pub fn get_member_with_subscription(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MemberWithSubscription>> {
        let Some(member) = self.get_member_by_username(username)? else {
            return Ok(None);
        };
        let current_subscription = self.get_current_subscription(&member.id, now)?;
        Ok(Some(MemberWithSubscription {
            member,
            current_subscription,
        }))
    }
}
