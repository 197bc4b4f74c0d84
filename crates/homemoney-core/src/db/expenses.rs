//! Expense operations

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::expense_filter::ExpenseFilter;
use super::{format_timestamp, new_id, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{round_cents, Expense, ExpenseMeta, ExpenseStatistics, NewExpense};
use crate::query::ExpenseQuery;
use crate::stats;

const EXPENSE_COLUMNS: &str = "id, type, remark, amount, time, created_at, updated_at";

fn row_to_expense(row: &Row) -> rusqlite::Result<Expense> {
    let time: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(Expense {
        id: row.get(0)?,
        expense_type: row.get(1)?,
        remark: row.get(2)?,
        amount: row.get(3)?,
        time: parse_datetime(&time),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

/// Normalize a validated input into the stored shape
fn normalized(expense: &NewExpense) -> Result<(String, Option<String>, f64, String)> {
    expense.validate()?;
    let time = expense
        .time
        .ok_or_else(|| Error::InvalidData("expense time is required".into()))?;
    let remark = expense
        .remark
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);
    Ok((
        expense.expense_type.trim().to_string(),
        remark,
        round_cents(expense.amount),
        format_timestamp(time),
    ))
}

impl Database {
    /// Create an expense record
    pub fn create_expense(&self, expense: &NewExpense) -> Result<Expense> {
        let (expense_type, remark, amount, time) = normalized(expense)?;
        let id = new_id();
        let now = format_timestamp(Utc::now());

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO expenses (id, type, remark, amount, time, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![id, expense_type, remark, amount, time, now, now],
        )?;

        self.get_expense(&id)?
            .ok_or_else(|| Error::NotFound(format!("expense {}", id)))
    }

    /// Create several expense records atomically
    ///
    /// Every record is validated before anything is written.
    pub fn create_expenses_batch(&self, expenses: &[NewExpense]) -> Result<Vec<Expense>> {
        let rows = expenses
            .iter()
            .enumerate()
            .map(|(i, e)| {
                normalized(e).map_err(|err| match err {
                    Error::InvalidData(msg) => Error::InvalidData(format!("record {}: {}", i, msg)),
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let now = format_timestamp(Utc::now());
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO expenses (id, type, remark, amount, time, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;
            for (expense_type, remark, amount, time) in &rows {
                let id = new_id();
                stmt.execute(params![id, expense_type, remark, amount, time, now, now])?;
                ids.push(id);
            }
        }
        tx.commit()?;

        let mut created = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(expense) = self.get_expense(id)? {
                created.push(expense);
            }
        }
        Ok(created)
    }

    /// Get an expense by ID
    pub fn get_expense(&self, id: &str) -> Result<Option<Expense>> {
        let conn = self.conn()?;
        let expense = conn
            .query_row(
                &format!("SELECT {} FROM expenses WHERE id = ?", EXPENSE_COLUMNS),
                params![id],
                row_to_expense,
            )
            .optional()?;
        Ok(expense)
    }

    /// Replace every field of an existing expense
    pub fn update_expense(&self, id: &str, expense: &NewExpense) -> Result<Expense> {
        let (expense_type, remark, amount, time) = normalized(expense)?;
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE expenses
            SET type = ?, remark = ?, amount = ?, time = ?, updated_at = ?
            WHERE id = ?
            "#,
            params![
                expense_type,
                remark,
                amount,
                time,
                format_timestamp(Utc::now()),
                id
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("expense {}", id)));
        }

        self.get_expense(id)?
            .ok_or_else(|| Error::NotFound(format!("expense {}", id)))
    }

    /// Delete an expense; fails with `NotFound` when no row matched
    pub fn delete_expense(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM expenses WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("expense {}", id)));
        }
        Ok(())
    }

    /// One page of matching expenses plus the total match count
    pub fn list_expenses(&self, query: &ExpenseQuery) -> Result<(Vec<Expense>, i64)> {
        let conn = self.conn()?;
        let filter = ExpenseFilter::from_query(query).build();

        let total: i64 = conn.query_row(
            &filter.build_count_query(),
            filter.params_refs().as_slice(),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {} FROM expenses {} {} LIMIT ? OFFSET ?",
            EXPENSE_COLUMNS, filter.where_clause, filter.order_clause
        );
        let mut params = filter.into_params();
        params.push(Box::new(query.limit));
        params.push(Box::new(query.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let expenses = stmt
            .query_map(param_refs.as_slice(), row_to_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((expenses, total))
    }

    /// Every expense matching the query's filters, ignoring pagination
    pub fn find_expenses(&self, query: &ExpenseQuery) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let filter = ExpenseFilter::from_query(query).build();
        let sql = format!(
            "SELECT {} FROM expenses {} {}",
            EXPENSE_COLUMNS, filter.where_clause, filter.order_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let expenses = stmt
            .query_map(filter.params_refs().as_slice(), row_to_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(expenses)
    }

    /// Statistics over every expense matching the query's filters
    pub fn expense_statistics(&self, query: &ExpenseQuery) -> Result<ExpenseStatistics> {
        let expenses = self.find_expenses(query)?;
        Ok(stats::compute(&expenses))
    }

    /// Distinct categories and months present in the table
    pub fn expense_meta(&self) -> Result<ExpenseMeta> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT DISTINCT type FROM expenses ORDER BY type")?;
        let unique_types = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        let mut stmt =
            conn.prepare("SELECT DISTINCT substr(time, 1, 7) FROM expenses ORDER BY 1 DESC")?;
        let available_months = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(ExpenseMeta {
            unique_types,
            available_months,
        })
    }
}
