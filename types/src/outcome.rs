//! Results of desk operations that carry more than a single ticket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notification::Notification;
use crate::ticket::{DeclineEntry, Ticket};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclineOutcome {
    /// The ledger row as of this call.
    pub entry: DeclineEntry,
    /// Whether the decliner held the ticket and it went back to the pool.
    pub released: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// The ticket as it was just before removal.
    pub ticket: Ticket,
    /// Alert sent to the responder who was working the ticket, if any.
    pub alert: Option<Notification>,
}

/// A ticket the responder refused, with the time of the (latest) refusal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclinedTicket {
    pub ticket: Ticket,
    pub declined_at: DateTime<Utc>,
}

/// What a responder has finished and what they turned down.
///
/// Deleted tickets drop out of both lists; their ledger rows remain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponderHistory {
    /// Done tickets the responder completed, newest ticket first.
    pub done: Vec<Ticket>,
    /// Declined tickets, most recent decline first.
    pub declined: Vec<DeclinedTicket>,
}
