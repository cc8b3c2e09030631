//! Formstead
//!
//! Form owners define a schema (named, typed fields with constraints); each
//! change to the field list creates a new immutable form instance. Submissions
//! are validated against the instance that is live when they arrive and are
//! stored atomically, with `unique` fields checked across all submissions to
//! that instance.
//!
//! ```rust,ignore
//! use formstead::{AppConfig, Environment, SubmissionProcessor};
//! use formstead_db::{RequestContext, SqliteStore};
//! use std::sync::Arc;
//!
//! let config = AppConfig::new(Environment::Production, "forms.sqlite3");
//! let store = Arc::new(SqliteStore::open(&config.db_path, config.store_config()).await?);
//! let processor = SubmissionProcessor::new(store.clone(), store);
//! let id = processor.process(form_id, &pairs, &RequestContext::new()).await?;
//! ```

pub mod config;
pub mod processor;
pub mod seed;

pub use config::{AppConfig, Environment};
pub use processor::SubmissionProcessor;
pub use seed::{seed_demo_data, SeedReport};
