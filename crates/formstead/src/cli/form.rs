//! Form command - define forms and evolve their fields
//!
//! Field lists are read as JSON, in the shape
//! `[{"field_name": .., "field_type": .., "field_constraints": [..]}]`.

use super::output;
use anyhow::{Context, Result};
use clap::Subcommand;
use formstead::AppConfig;
use formstead_db::{FormData, FormStore};
use formstead_ids::{FormId, UserId};
use formstead_schema::FieldSpec;
use std::path::{Path, PathBuf};

/// Subcommands for form management
#[derive(Subcommand, Debug, Clone)]
pub enum FormAction {
    /// Create a form (version 1)
    Create {
        /// Owning user
        #[arg(long)]
        user: UserId,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// JSON field list (`-` for stdin)
        #[arg(long)]
        fields: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show a form with its live fields
    Show {
        id: FormId,
        #[arg(long)]
        json: bool,
    },
    /// List forms owned by a user
    List {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        json: bool,
    },
    /// Show every version of a form, oldest first
    History {
        id: FormId,
        #[arg(long)]
        json: bool,
    },
    /// Replace the field list, creating the next version
    Redefine {
        id: FormId,
        /// JSON field list (`-` for stdin)
        #[arg(long)]
        fields: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Change a form's name
    Rename { id: FormId, name: String },
    /// Change a form's description
    Describe { id: FormId, description: String },
    /// Delete a form with all versions and submissions
    Delete { id: FormId },
}

fn load_fields(path: &Path) -> Result<Vec<FieldSpec>> {
    let raw = super::read_input(path)?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Field list in {} is not valid JSON", path.display()))
}

pub async fn run(config: &AppConfig, action: FormAction) -> Result<()> {
    let store = super::open_store(config).await?;

    match action {
        FormAction::Create {
            user,
            name,
            description,
            fields,
            json,
        } => {
            let specs = load_fields(&fields)?;
            let id = store.create_form(user, &name, &description, &specs).await?;
            let instance = store.live_instance(id).await?;
            if json {
                output::print_json(&serde_json::json!({
                    "form_id": id,
                    "form_instance_id": instance.id,
                    "form_version": instance.form_version,
                }))?;
            } else {
                println!("Created form {} (instance {}, version 1)", id, instance.id);
            }
        }
        FormAction::Show { id, json } => {
            let form = store.get_form(id).await?;
            if json {
                output::print_json(&form)?;
            } else {
                print_form(&form);
            }
        }
        FormAction::List { user, json } => {
            let forms = store.get_forms_by_user(user).await?;
            if json {
                output::print_json(&forms)?;
            } else if forms.is_empty() {
                println!("No forms for user {}", user);
            } else {
                let rows = forms
                    .iter()
                    .map(|f| {
                        vec![
                            f.id.to_string(),
                            f.name.clone(),
                            f.form_version.to_string(),
                            f.fields.len().to_string(),
                            output::format_timestamp(&f.updated_at),
                        ]
                    })
                    .collect();
                output::print_table(&["ID", "NAME", "VERSION", "FIELDS", "LAST MODIFIED"], rows);
            }
        }
        FormAction::History { id, json } => {
            let versions = store.list_instances(id).await?;
            if json {
                output::print_json(&versions)?;
            } else {
                for version in &versions {
                    println!("Version {} (instance {})", version.form_version, version.instance_id);
                    output::print_fields(&version.fields);
                }
            }
        }
        FormAction::Redefine { id, fields, json } => {
            let specs = load_fields(&fields)?;
            let instance = store.redefine_fields(id, &specs).await?;
            if json {
                output::print_json(&instance)?;
            } else {
                println!(
                    "Form {} is now at version {} (instance {})",
                    id, instance.form_version, instance.id
                );
            }
        }
        FormAction::Rename { id, name } => {
            store.rename_form(id, &name).await?;
            println!("Renamed form {}", id);
        }
        FormAction::Describe { id, description } => {
            store.update_description(id, &description).await?;
            println!("Updated description of form {}", id);
        }
        FormAction::Delete { id } => {
            store.delete_form(id).await?;
            println!("Deleted form {}", id);
        }
    }
    Ok(())
}

fn print_form(form: &FormData) {
    println!("Form {}: {}", form.id, form.name);
    if !form.description.is_empty() {
        println!("  {}", form.description);
    }
    println!(
        "  owner {} | version {} | instance {} | last modified {}",
        form.user_id,
        form.form_version,
        form.instance_id,
        output::format_timestamp(&form.updated_at)
    );
    output::print_fields(&form.fields);
}
