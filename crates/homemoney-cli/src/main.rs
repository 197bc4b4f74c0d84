//! HomeMoney CLI - Household finance backend
//!
//! Usage:
//!   homemoney init                   Initialize database
//!   homemoney serve --port 8080      Start web server
//!   homemoney expenses stats         Summarize spending
//!   homemoney subscriptions sweep    Renew and expire subscriptions

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            sweep_interval,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                cli.no_encrypt,
                &cli.data_dir,
                sweep_interval,
            )
            .await
        }
        Commands::Expenses { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_expenses_list(&db, &commands::ExpenseFilter::default()),
                Some(ExpensesAction::List {
                    month,
                    expense_type,
                    keyword,
                    sort,
                    limit,
                    page,
                }) => commands::cmd_expenses_list(
                    &db,
                    &commands::ExpenseFilter {
                        month,
                        expense_type,
                        keyword,
                        sort,
                        limit: Some(limit),
                        page: Some(page),
                    },
                ),
                Some(ExpensesAction::Add {
                    expense_type,
                    amount,
                    remark,
                    time,
                }) => commands::cmd_expenses_add(
                    &db,
                    &expense_type,
                    amount,
                    remark.as_deref(),
                    time.as_deref(),
                ),
                Some(ExpensesAction::Delete { id }) => commands::cmd_expenses_delete(&db, &id),
                Some(ExpensesAction::Stats {
                    month,
                    expense_type,
                    json,
                }) => commands::cmd_expenses_stats(
                    &db,
                    &commands::ExpenseFilter {
                        month,
                        expense_type,
                        ..Default::default()
                    },
                    json,
                ),
            }
        }
        Commands::Plans { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(PlansAction::List) => commands::cmd_plans_list(&db),
                Some(PlansAction::Add {
                    name,
                    duration,
                    price,
                    period,
                    description,
                }) => commands::cmd_plans_add(
                    &db,
                    &name,
                    duration,
                    price,
                    period.as_deref(),
                    description.as_deref(),
                ),
                Some(PlansAction::Toggle { id }) => commands::cmd_plans_toggle(&db, &id),
            }
        }
        Commands::Subscriptions { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                SubscriptionsAction::List { username } => {
                    commands::cmd_subscriptions_list(&db, &username)
                }
                SubscriptionsAction::Current { username } => {
                    commands::cmd_subscriptions_current(&db, &username)
                }
                SubscriptionsAction::Expiring { days } => {
                    commands::cmd_subscriptions_expiring(&db, days)
                }
                SubscriptionsAction::Sweep => commands::cmd_subscriptions_sweep(&db),
            }
        }
    }
}
