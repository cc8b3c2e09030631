//! Application configuration
//!
//! Built once from CLI flags and environment variables, then passed to the
//! components that need it. Nothing reads the environment after startup.

use anyhow::Result;
use formstead_db::StoreConfig;
use std::path::PathBuf;
use std::time::Duration;

const DB_FILE_NAME: &str = "formstead.sqlite3";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Environment {
    Development,
    Testing,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// Write-transaction budget used unless overridden.
    ///
    /// Development and testing get an hour so a debugger can sit on a
    /// breakpoint mid-transaction.
    pub fn default_transaction_timeout(&self) -> Duration {
        match self {
            Environment::Development | Environment::Testing => Duration::from_secs(60 * 60),
            Environment::Staging | Environment::Production => Duration::from_secs(3),
        }
    }

    /// Whether `init` seeds the demo user and forms.
    pub fn seeds_demo_data(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub db_path: PathBuf,
    pub transaction_timeout: Duration,
}

impl AppConfig {
    pub fn new(environment: Environment, db_path: impl Into<PathBuf>) -> Self {
        Self {
            environment,
            db_path: db_path.into(),
            transaction_timeout: environment.default_transaction_timeout(),
        }
    }

    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default().with_transaction_timeout(self.transaction_timeout)
    }

    /// Default database location: ~/.formstead/formstead.sqlite3
    pub fn default_db_path() -> Result<PathBuf> {
        Ok(formstead_logging::formstead_home()?.join(DB_FILE_NAME))
    }
}

/// Global configuration flags shared by every subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    /// Deployment environment
    #[arg(long = "env", env = "FORMSTEAD_ENV", value_enum, default_value_t = Environment::Production, global = true)]
    pub environment: Environment,

    /// SQLite database file (default: ~/.formstead/formstead.sqlite3)
    #[arg(long = "db", env = "FORMSTEAD_DB", global = true)]
    pub db_path: Option<PathBuf>,

    /// Override the write-transaction timeout, in milliseconds
    #[arg(long = "tx-timeout-ms", env = "FORMSTEAD_TX_TIMEOUT_MS", global = true)]
    pub transaction_timeout_ms: Option<u64>,
}

impl ConfigArgs {
    pub fn resolve(&self) -> Result<AppConfig> {
        let db_path = match &self.db_path {
            Some(path) => path.clone(),
            None => AppConfig::default_db_path()?,
        };

        let mut config = AppConfig::new(self.environment, db_path);
        if let Some(ms) = self.transaction_timeout_ms {
            config = config.with_transaction_timeout(Duration::from_millis(ms));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_by_environment() {
        assert_eq!(
            Environment::Production.default_transaction_timeout(),
            Duration::from_secs(3)
        );
        assert_eq!(
            Environment::Staging.default_transaction_timeout(),
            Duration::from_secs(3)
        );
        assert_eq!(
            Environment::Development.default_transaction_timeout(),
            Duration::from_secs(3600)
        );
        assert_eq!(
            Environment::Testing.default_transaction_timeout(),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn test_override_reaches_store_config() {
        let config = AppConfig::new(Environment::Production, "/tmp/f.db")
            .with_transaction_timeout(Duration::from_millis(250));
        assert_eq!(
            config.store_config().transaction_timeout,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_resolve_with_explicit_path() {
        let args = ConfigArgs {
            environment: Environment::Testing,
            db_path: Some(PathBuf::from("/tmp/forms.db")),
            transaction_timeout_ms: None,
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/forms.db"));
        assert_eq!(config.transaction_timeout, Duration::from_secs(3600));

        let args = ConfigArgs {
            transaction_timeout_ms: Some(10),
            ..args
        };
        assert_eq!(
            args.resolve().unwrap().transaction_timeout,
            Duration::from_millis(10)
        );
    }

    #[test]
    fn test_only_development_seeds() {
        assert!(Environment::Development.seeds_demo_data());
        assert!(!Environment::Testing.seeds_demo_data());
        assert!(!Environment::Production.seeds_demo_data());
    }
}
