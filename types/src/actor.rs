//! Caller identity as supplied by the session provider.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DeskError;
use crate::ids::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Creates and owns tickets.
    Employee,
    /// Works tickets from the shared pool.
    Responder,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Responder => "responder",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ActorParseError {
    #[error("expected <id>:<role>[:<name>], got {0:?}")]
    Shape(String),
    #[error("invalid user id {0:?}")]
    Id(String),
    #[error("unknown role {0:?} (expected employee or responder)")]
    Role(String),
}

impl FromStr for Role {
    type Err = ActorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee" => Ok(Self::Employee),
            "responder" => Ok(Self::Responder),
            _ => Err(ActorParseError::Role(s.to_string())),
        }
    }
}

/// The authenticated caller of a desk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    /// Display name, used when the desk writes a message on the actor's behalf.
    pub name: String,
}

impl Actor {
    #[must_use]
    pub fn employee(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Employee,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn responder(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Responder,
            name: name.into(),
        }
    }

    /// Gate for role-scoped operations.
    pub fn require(&self, role: Role) -> Result<(), DeskError> {
        if self.role == role {
            Ok(())
        } else {
            Err(DeskError::Forbidden)
        }
    }
}

/// Parses `<id>:<role>[:<name>]`. When the name is omitted the role's
/// capitalised form is used, matching the fallback of the session provider.
impl FromStr for Actor {
    type Err = ActorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(id), Some(role)) = (parts.next(), parts.next()) else {
            return Err(ActorParseError::Shape(s.to_string()));
        };
        let id: UserId = id.parse().map_err(|_| ActorParseError::Id(id.to_string()))?;
        let role: Role = role.parse()?;
        let name = match parts.next().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => match role {
                Role::Employee => "Employee".to_string(),
                Role::Responder => "Responder".to_string(),
            },
        };
        Ok(Self { id, role, name })
    }
}
