use thiserror::Error;

/// Outcome taxonomy for desk operations.
///
/// `NotFound`, `Forbidden` and `Conflict` are expected results reported to the
/// caller for a retry or a user-facing message. `Storage` wraps a backend
/// failure; the transaction has been rolled back when it surfaces.
#[derive(Debug, Error)]
pub enum DeskError {
    /// The ticket does not exist, or is not owned by the acting creator.
    #[error("ticket not found")]
    NotFound,
    /// The actor lacks the required role or ownership relation.
    #[error("operation not permitted for this actor")]
    Forbidden,
    /// A concurrent operation won the race for this ticket.
    #[error("ticket was changed by another responder")]
    Conflict,
    #[error("storage error: {0:#}")]
    Storage(#[source] anyhow::Error),
}

impl DeskError {
    /// Whether the caller can act on this outcome without operator help.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

impl From<anyhow::Error> for DeskError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(err)
    }
}
