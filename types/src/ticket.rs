//! Ticket and decline-ledger records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{TicketId, UserId};

/// Lifecycle state of a ticket.
///
/// `Pending` tickets sit in the shared pool. `InProcess` and `Done` tickets
/// always carry a responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Pending,
    InProcess,
    Done,
}

#[derive(Debug, Error)]
#[error("unknown ticket status: {0}")]
pub struct UnknownStatus(pub String);

impl TicketStatus {
    /// Persisted column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProcess => "in_process",
            Self::Done => "done",
        }
    }

    /// Human wording used in notification bodies.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProcess => "in process",
            Self::Done => "done",
        }
    }

    /// Whether a ticket in this state must have a responder.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        matches!(self, Self::InProcess | Self::Done)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_process" => Ok(Self::InProcess),
            "done" => Ok(Self::Done),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A unit of work created by an employee and worked by a responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub creator: UserId,
    pub responder: Option<UserId>,
    pub status: TicketStatus,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Checks the record-level invariants:
    /// - a responder is present iff the status is `in_process` or `done`
    /// - `completed_at` is present iff the status is `done`
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.responder.is_some() == self.status.is_assigned()
            && self.completed_at.is_some() == (self.status == TicketStatus::Done)
    }

    #[must_use]
    pub fn is_held_by(&self, responder: UserId) -> bool {
        self.status == TicketStatus::InProcess && self.responder == Some(responder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineStatus {
    Declined,
}

impl DeclineStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Declined => "declined",
        }
    }
}

impl FromStr for DeclineStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "declined" => Ok(Self::Declined),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A responder's standing refusal of one ticket. At most one per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclineEntry {
    pub ticket: TicketId,
    pub responder: UserId,
    pub status: DeclineStatus,
    pub created_at: DateTime<Utc>,
}
