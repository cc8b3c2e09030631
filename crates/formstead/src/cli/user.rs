//! User command - manage form owners

use super::output;
use anyhow::Result;
use clap::Subcommand;
use formstead::AppConfig;
use formstead_ids::UserId;

/// Subcommands for user management
#[derive(Subcommand, Debug, Clone)]
pub enum UserAction {
    /// Register a form owner
    Add {
        name: String,
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// Show a user
    Show {
        id: UserId,
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(config: &AppConfig, action: UserAction) -> Result<()> {
    let store = super::open_store(config).await?;

    match action {
        UserAction::Add { name, email, json } => {
            let id = store.create_user(&name, &email).await?;
            if json {
                output::print_json(&serde_json::json!({ "user_id": id }))?;
            } else {
                println!("Created user {}", id);
            }
        }
        UserAction::Show { id, json } => {
            let user = store.get_user(id).await?;
            if json {
                output::print_json(&user)?;
            } else {
                output::print_table(
                    &["ID", "NAME", "EMAIL", "CREATED"],
                    vec![vec![
                        user.id.to_string(),
                        user.name,
                        user.email,
                        output::format_timestamp(&user.created_at),
                    ]],
                );
            }
        }
    }
    Ok(())
}
