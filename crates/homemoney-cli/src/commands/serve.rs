//! Server command implementation

use std::path::Path;

use anyhow::Result;
use homemoney_server::{ServerConfig, SweepScheduleConfig};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_encrypt: bool,
    data_dir: &Path,
    sweep_interval: Option<u64>,
) -> Result<()> {
    println!("🚀 Starting HomeMoney web server...");
    println!("   Database: {}", db_path.display());
    println!("   Data dir: {}", data_dir.display());
    println!("   Listening: http://{}:{}", host, port);

    let config = ServerConfig::from_env(data_dir.to_path_buf());
    println!("   🔁 Renew policy: {}", config.renew_policy);
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 CORS origins: {} (HOMEMONEY_CORS_ORIGINS)",
            config.allowed_origins.join(", ")
        );
    }

    let sweep = match sweep_interval {
        Some(minutes) => SweepScheduleConfig::every(minutes),
        None => SweepScheduleConfig::from_env(),
    };
    if let Some(ref sweep) = sweep {
        println!(
            "   ⏰ Subscription sweep: every {} min",
            sweep.interval_minutes
        );
    }

    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;
    homemoney_server::serve_with_config(db, host, port, config, sweep).await?;

    Ok(())
}
