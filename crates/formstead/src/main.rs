//! Formstead command-line interface
//!
//! Operator surface over the form and submission stores: initialize a
//! database, manage form owners and forms, submit and inspect submissions.

use anyhow::Result;
use clap::{Parser, Subcommand};
use formstead::config::ConfigArgs;
use formstead_db::FormError;
use formstead_logging::{init_logging, LogConfig};
use std::process::ExitCode;
use tracing::debug;

mod cli;

/// Exit code for errors the caller can fix by changing the input.
const EXIT_REJECTED: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "formstead", about = "Versioned forms with validated submissions", version)]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Only log errors to stderr
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database (and demo data in development)
    Init(cli::InitArgs),

    /// Manage form owners
    User {
        #[command(subcommand)]
        action: cli::user::UserAction,
    },

    /// Define and evolve forms
    Form {
        #[command(subcommand)]
        action: cli::form::FormAction,
    },

    /// Submit values to a form's live version
    Submit(cli::submission::SubmitArgs),

    /// Inspect stored submissions
    Submission {
        #[command(subcommand)]
        action: cli::submission::SubmissionAction,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config.resolve()?;

    match cli.command {
        Commands::Init(args) => cli::run_init(&config, args).await,
        Commands::User { action } => cli::user::run(&config, action).await,
        Commands::Form { action } => cli::form::run(&config, action).await,
        Commands::Submit(args) => cli::submission::run_submit(&config, args).await,
        Commands::Submission { action } => cli::submission::run(&config, action).await,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(LogConfig {
        app_name: "formstead",
        verbose: cli.verbose,
        quiet: cli.quiet,
        log_dir: None,
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: logging disabled: {:#}", err);
            None
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to start async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let rejected = err
                .downcast_ref::<FormError>()
                .is_some_and(FormError::is_user_correctable);
            debug!(error = %err, "Command failed");
            eprintln!("Error: {:#}", err);
            if rejected {
                ExitCode::from(EXIT_REJECTED)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
