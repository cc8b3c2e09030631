//! CLI command implementations.

pub mod form;
pub mod output;
pub mod submission;
pub mod user;

use anyhow::{Context, Result};
use formstead::{seed_demo_data, AppConfig};
use formstead_db::SqliteStore;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Open (creating if needed) the configured database.
pub async fn open_store(config: &AppConfig) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.db_path, config.store_config())
        .await
        .with_context(|| format!("Failed to open database: {}", config.db_path.display()))?;
    Ok(Arc::new(store))
}

/// Arguments for the init command
#[derive(Debug, clap::Args)]
pub struct InitArgs {
    /// Seed the demo user and forms regardless of environment
    #[arg(long, conflicts_with = "no_seed")]
    pub seed: bool,

    /// Never seed demo data
    #[arg(long)]
    pub no_seed: bool,

    #[arg(long)]
    pub json: bool,
}

/// Create the database schema and, in development, the demo data.
pub async fn run_init(config: &AppConfig, args: InitArgs) -> Result<()> {
    let store = open_store(config).await?;
    let seed = args.seed || (config.environment.seeds_demo_data() && !args.no_seed);

    let report = if seed {
        Some(seed_demo_data(&store).await.context("Failed to seed demo data")?)
    } else {
        None
    };

    info!(
        path = %config.db_path.display(),
        environment = config.environment.as_str(),
        seeded = seed,
        "Initialized database"
    );

    if args.json {
        output::print_json(&serde_json::json!({
            "database": config.db_path.to_string_lossy(),
            "environment": config.environment.as_str(),
            "transaction_timeout_ms": config.transaction_timeout.as_millis() as u64,
            "seed": report,
        }))?;
    } else {
        println!("Database ready: {}", config.db_path.display());
        if let Some(report) = report {
            let ids: Vec<String> = report.form_ids.iter().map(|id| id.to_string()).collect();
            println!("Demo user {} owns forms: {}", report.user_id, ids.join(", "));
        }
    }
    Ok(())
}

/// Read a whole input: a file path, or `-` for stdin.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Parse `name=value`. The value may itself contain `=`.
pub fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))
}
