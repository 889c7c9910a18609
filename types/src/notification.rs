use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{NotificationId, TicketId, UserId};
use crate::ticket::UnknownStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Generated by the system as a side effect of a transition.
    Alert,
    /// Person-to-person message written by an external collaborator.
    Direct,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Direct => "direct",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alert" => Ok(Self::Alert),
            "direct" => Ok(Self::Direct),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// An inbox record. Created once, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub sender: Option<UserId>,
    pub receiver: UserId,
    pub ticket: Option<TicketId>,
    pub subject: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
