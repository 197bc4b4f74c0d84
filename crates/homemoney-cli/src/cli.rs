//! CLI argument definitions using clap
//!
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// HomeMoney - Household expenses and memberships
#[derive(Parser)]
#[command(name = "homemoney")]
#[command(about = "Self-hosted household finance backend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "homemoney.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set HOMEMONEY_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Directory for JSON documents and donation records
    #[arg(long, default_value = "data", global = true)]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "8080")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Run the renew/expire sweep every N minutes
        ///
        /// Overrides HOMEMONEY_SWEEP_INTERVAL_MINUTES. 0 disables the sweep.
        #[arg(long)]
        sweep_interval: Option<u64>,
    },

    /// Manage expense records
    Expenses {
        #[command(subcommand)]
        action: Option<ExpensesAction>,
    },

    /// Manage the subscription plan catalog
    Plans {
        #[command(subcommand)]
        action: Option<PlansAction>,
    },

    /// Inspect member subscriptions and run sweeps
    Subscriptions {
        #[command(subcommand)]
        action: SubscriptionsAction,
    },
}

#[derive(Subcommand)]
pub enum ExpensesAction {
    /// List expenses, newest first by default
    List {
        /// Month filter (YYYY-MM)
        #[arg(long)]
        month: Option<String>,

        /// Category filter
        #[arg(long = "type")]
        expense_type: Option<String>,

        /// Match against category or remark
        #[arg(long)]
        keyword: Option<String>,

        /// Sort: dateAsc, dateDesc, amountAsc, amountDesc
        #[arg(long)]
        sort: Option<String>,

        /// Records per page (1-100)
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: i64,
    },

    /// Record an expense
    Add {
        /// Category label
        #[arg(long = "type")]
        expense_type: String,

        /// Amount (rounded to cents)
        #[arg(long)]
        amount: f64,

        /// Optional note
        #[arg(long)]
        remark: Option<String>,

        /// When it happened (RFC 3339 or YYYY-MM-DD, defaults to now)
        #[arg(long)]
        time: Option<String>,
    },

    /// Delete an expense
    Delete {
        /// Expense ID
        id: String,
    },

    /// Show statistics for a filtered set
    Stats {
        /// Month filter (YYYY-MM)
        #[arg(long)]
        month: Option<String>,

        /// Category filter
        #[arg(long = "type")]
        expense_type: Option<String>,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum PlansAction {
    /// List all plans, including inactive ones
    List,

    /// Add a plan
    Add {
        /// Unique plan name
        #[arg(long)]
        name: String,

        /// Window length in days
        #[arg(long)]
        duration: i64,

        /// Price per window
        #[arg(long)]
        price: f64,

        /// Period label: monthly, quarterly, yearly
        #[arg(long)]
        period: Option<String>,

        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },

    /// Flip a plan between active and inactive
    Toggle {
        /// Plan ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum SubscriptionsAction {
    /// Subscription history for a member
    List {
        /// Member username
        username: String,
    },

    /// The member's current subscription
    Current {
        /// Member username
        username: String,
    },

    /// Active subscriptions ending soon
    Expiring {
        /// Look-ahead window in days
        #[arg(long, default_value = "7")]
        days: i64,
    },

    /// Auto-renew, then expire overdue subscriptions
    Sweep,
}
