//! Helpdesk CLI - operator entry point for the ticket desk.
//!
//! # Architecture
//!
//! ```text
//! main() -> init_tracing() -> Cli::parse() -> commands::run()
//!                                                  |
//!                                   HelpdeskConfig + TicketDesk::open
//!                                                  |
//!                                       JSON on stdout | exit code
//! ```
//!
//! Exit codes: 0 success, 2 usage, 3 not found, 4 forbidden, 5 conflict,
//! 1 anything else.

mod commands;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::commands::Cli;

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match commands::run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::debug!("Command failed: {err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(commands::exit_code(&err))
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_helpdesk_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::debug!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // stdout carries command output, so logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_helpdesk_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in helpdesk_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn helpdesk_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.helpdesk/logs/helpdesk.log
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".helpdesk").join("logs").join("helpdesk.log"));
    }

    // Fallback: ./.helpdesk/logs/helpdesk.log
    candidates.push(PathBuf::from(".helpdesk").join("logs").join("helpdesk.log"));

    candidates
}
