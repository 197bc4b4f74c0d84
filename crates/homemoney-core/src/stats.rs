//! Expense statistics engine
//!
//! Pure aggregation over an already-filtered record set. An empty set yields
//! zeros everywhere rather than absent values.

use std::collections::BTreeMap;

use crate::models::{Expense, ExpenseStatistics, TypeDistribution};

/// Compute statistics over a set of expenses
pub fn compute(expenses: &[Expense]) -> ExpenseStatistics {
    let count = expenses.len();
    if count == 0 {
        return ExpenseStatistics::default();
    }

    let mut amounts: Vec<f64> = expenses.iter().map(|e| e.amount).collect();
    amounts.sort_by(|a, b| a.total_cmp(b));

    let total_amount: f64 = amounts.iter().sum();
    let mid = count / 2;
    let median_amount = if count % 2 == 0 {
        (amounts[mid - 1] + amounts[mid]) / 2.0
    } else {
        amounts[mid]
    };

    let mut type_distribution: BTreeMap<String, TypeDistribution> = BTreeMap::new();
    for expense in expenses {
        let entry = type_distribution
            .entry(expense.expense_type.clone())
            .or_default();
        entry.count += 1;
        entry.amount += expense.amount;
    }
    for entry in type_distribution.values_mut() {
        entry.percentage = (entry.count as f64 * 100.0 / count as f64).round() as i64;
    }

    ExpenseStatistics {
        count,
        total_amount,
        average_amount: total_amount / count as f64,
        median_amount,
        min_amount: amounts[0],
        max_amount: amounts[count - 1],
        type_distribution,
    }
}
