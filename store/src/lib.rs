//! Durable ticket state for the helpdesk router
//!
//! This crate provides:
//! - The ticket store (one SQLite row per ticket, CAS status updates)
//! - The decline ledger (permanent per-responder refusals)
//! - The assignment view (what a responder may see right now)
//! - Deletion alerts written into responder inboxes
//! - `TicketDesk`, the transition engine tying them together
//!
//! # Architecture
//!
//! ```text
//! TicketDesk (one connection, one IMMEDIATE tx per transition)
//! ├── tickets:    Ticket Store
//! ├── ledger:     Decline Ledger
//! ├── assignment: Assignment View
//! └── notify:     Notification Emitter
//! ```

mod assignment;
mod desk;
mod ledger;
mod notify;
mod schema;
mod sqlite_util;
mod tickets;

pub use desk::{DeskOptions, EditPolicy, TicketDesk};
pub use notify::deletion_alert_text;
pub use schema::CURRENT_SCHEMA_VERSION;
