//! Command-line surface: one subcommand per desk operation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use helpdesk_config::{CONFIG_ENV, HelpdeskConfig, default_db_path};
use helpdesk_store::{DeskOptions, EditPolicy, TicketDesk};
use helpdesk_types::{Actor, DeskError, TicketContent, TicketId};

/// Helpdesk ticket router.
#[derive(Debug, Parser)]
#[command(name = "helpdesk", version, about = "Route helpdesk tickets between employees and responders")]
pub(crate) struct Cli {
    /// Config file (default: ~/.helpdesk/config.toml)
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub(crate) config: Option<PathBuf>,

    /// Database file, overriding [store] path
    #[arg(long, global = true)]
    pub(crate) db: Option<PathBuf>,

    /// Caller identity, e.g. `7:responder:Rae`
    #[arg(long = "as", value_name = "ID:ROLE[:NAME]")]
    pub(crate) actor: Actor,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Open a new ticket (employee)
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    /// Take a pending ticket (responder)
    Claim { id: TicketId },
    /// Permanently refuse a ticket (responder)
    Decline { id: TicketId },
    /// Mark a ticket done (responder)
    Complete { id: TicketId },
    /// Replace a ticket's title and description (creator)
    Edit {
        id: TicketId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    /// Delete a ticket, alerting its responder (creator)
    Delete { id: TicketId },
    /// Tickets visible to the calling responder
    Assigned,
    /// Tickets created by the calling employee
    Owned,
    /// Done and declined tickets of the calling responder
    History,
    /// Look up one ticket
    Show { id: TicketId },
    /// Notifications addressed to the caller
    Inbox,
}

pub(crate) fn run(cli: &Cli) -> Result<Value> {
    let config = load_config(cli.config.as_deref())?;
    let db_path = cli
        .db
        .clone()
        .or_else(|| config.db_path())
        .or_else(default_db_path)
        .context("Could not determine database path; pass --db")?;

    let mut desk = TicketDesk::open(&db_path, &desk_options(&config))?;
    let actor = &cli.actor;

    let value = match &cli.command {
        Command::Create { title, description } => {
            serde_json::to_value(desk.create(actor, &content(title, description)?)?)?
        }
        Command::Claim { id } => serde_json::to_value(desk.claim(actor, *id)?)?,
        Command::Decline { id } => serde_json::to_value(desk.decline(actor, *id)?)?,
        Command::Complete { id } => serde_json::to_value(desk.complete(actor, *id)?)?,
        Command::Edit {
            id,
            title,
            description,
        } => serde_json::to_value(desk.edit_content(actor, *id, &content(title, description)?)?)?,
        Command::Delete { id } => serde_json::to_value(desk.delete(actor, *id)?)?,
        Command::Assigned => serde_json::to_value(desk.list_assigned(actor)?)?,
        Command::Owned => serde_json::to_value(desk.list_owned(actor)?)?,
        Command::History => serde_json::to_value(desk.history(actor)?)?,
        Command::Show { id } => serde_json::to_value(desk.ticket(*id)?)?,
        Command::Inbox => json!({
            "unread": desk.unread_count(actor.id)?,
            "notifications": desk.inbox(actor.id)?,
        }),
    };
    Ok(value)
}

/// Process exit status for a failed command.
pub(crate) fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DeskError>() {
        Some(DeskError::NotFound) => 3,
        Some(DeskError::Forbidden) => 4,
        Some(DeskError::Conflict) => 5,
        Some(DeskError::Storage(_)) | None => 1,
    }
}

fn load_config(path: Option<&Path>) -> Result<HelpdeskConfig> {
    let loaded = match path {
        Some(path) => HelpdeskConfig::load_from(path)?,
        None => HelpdeskConfig::load()?,
    };
    Ok(loaded.unwrap_or_default())
}

fn desk_options(config: &HelpdeskConfig) -> DeskOptions {
    DeskOptions {
        busy_timeout: config.busy_timeout(),
        edit_policy: if config.edit_after_claim() {
            EditPolicy::Always
        } else {
            EditPolicy::PendingOnly
        },
    }
}

fn content(title: &str, description: &str) -> Result<TicketContent> {
    TicketContent::new(title, description).context("Title and description must not be empty")
}
