//! Submit and inspect submissions

use super::output;
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use formstead::{AppConfig, SubmissionProcessor};
use formstead_db::{RequestContext, SubmissionStore};
use formstead_ids::{FormId, SubmissionId};
use formstead_schema::FieldValue;
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for the submit command
#[derive(Debug, clap::Args)]
pub struct SubmitArgs {
    pub form_id: FormId,

    /// Field value as NAME=VALUE (repeatable, first occurrence wins)
    #[arg(short = 'f', long = "field", value_parser = super::parse_pair)]
    pub fields: Vec<(String, String)>,

    /// JSON object of typed values (`-` for stdin), instead of --field
    #[arg(long, conflicts_with = "fields")]
    pub values: Option<PathBuf>,

    /// Recorded in submission metadata
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Recorded in submission metadata
    #[arg(long)]
    pub ip_address: Option<String>,

    /// Per-request deadline in milliseconds
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    #[arg(long)]
    pub json: bool,
}

/// Subcommands for reading stored submissions
#[derive(Subcommand, Debug, Clone)]
pub enum SubmissionAction {
    /// Show one submission
    Show {
        id: SubmissionId,
        #[arg(long)]
        json: bool,
    },
    /// List submissions of a form, oldest first
    List {
        form_id: FormId,
        #[arg(long)]
        json: bool,
    },
}

pub async fn run_submit(config: &AppConfig, args: SubmitArgs) -> Result<()> {
    let store = super::open_store(config).await?;
    let processor = SubmissionProcessor::new(store.clone(), store.clone());

    let mut ctx = RequestContext::new().with_metadata(serde_json::json!({
        "user_agent": args.user_agent.unwrap_or_default(),
        "ip_address": args.ip_address.unwrap_or_default(),
    }));
    if let Some(ms) = args.deadline_ms {
        ctx = ctx.with_timeout(Duration::from_millis(ms));
    }

    let id = match &args.values {
        Some(path) => {
            let raw = super::read_input(path)?;
            let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON object", path.display()))?;
            let values = object
                .into_iter()
                .map(|(k, v)| (k, FieldValue::from_json(v)))
                .collect();
            processor.process_values(args.form_id, values, &ctx).await?
        }
        None => {
            if args.fields.is_empty() {
                bail!("Nothing to submit: pass --field NAME=VALUE or --values FILE");
            }
            processor.process(args.form_id, &args.fields, &ctx).await?
        }
    };

    if args.json {
        output::print_json(&serde_json::json!({ "submission_id": id }))?;
    } else {
        println!("Stored submission {}", id);
    }
    Ok(())
}

pub async fn run(config: &AppConfig, action: SubmissionAction) -> Result<()> {
    let store = super::open_store(config).await?;

    match action {
        SubmissionAction::Show { id, json } => {
            let record = store.get_submission(id).await?;
            if json {
                output::print_json(&record)?;
            } else {
                println!(
                    "Submission {} to form {} (instance {}) at {}",
                    record.id,
                    record.form_id,
                    record.form_instance_id,
                    output::format_timestamp(&record.submitted_at)
                );
                let rows = record
                    .fields
                    .iter()
                    .map(|f| {
                        vec![
                            f.name.clone(),
                            f.field_type.to_string(),
                            if f.hashed { format!("(hashed) {}", f.content) } else { f.content.clone() },
                        ]
                    })
                    .collect();
                output::print_table(&["FIELD", "TYPE", "VALUE"], rows);
            }
        }
        SubmissionAction::List { form_id, json } => {
            let records = store.list_submissions(form_id).await?;
            if json {
                output::print_json(&records)?;
            } else {
                let rows = records
                    .iter()
                    .map(|r| {
                        vec![
                            r.id.to_string(),
                            r.form_instance_id.to_string(),
                            r.fields.len().to_string(),
                            output::format_timestamp(&r.submitted_at),
                        ]
                    })
                    .collect();
                output::print_table(&["ID", "INSTANCE", "FIELDS", "SUBMITTED"], rows);
            }
        }
    }
    Ok(())
}
