//! Transition Engine - the claim / decline / complete / delete state machine.
//!
//! `TicketDesk` owns one SQLite connection. Workers that serve requests in
//! parallel each open their own desk against the same database file. Every
//! mutating operation runs in a single `BEGIN IMMEDIATE` transaction and
//! status changes are compare-and-swap updates, so concurrent callers are
//! linearised per ticket and a lost race surfaces as [`DeskError::Conflict`].
//!
//! ```text
//! Actor ──► TicketDesk::{claim, decline, complete, edit_content, delete}
//!              │  one IMMEDIATE transaction per call
//!              ├── tickets    (Ticket Store)
//!              ├── ledger     (Decline Ledger)
//!              └── notify     (Notification Emitter)
//!
//! Actor ──► TicketDesk::{list_assigned, list_owned, history}
//!              ├── assignment (Assignment View, read-only)
//!              └── tickets + ledger (responder history, read-only)
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use helpdesk_types::{
    Actor, DeclineEntry, DeclineOutcome, DeleteOutcome, DeskError, Notification, ResponderHistory,
    Role, Ticket, TicketContent, TicketId, TicketStatus, UserId,
};

use crate::sqlite_util::{now, open_memory_db, open_secure_db};
use crate::{assignment, ledger, notify, schema, tickets};

/// Who may change a ticket's title and description, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditPolicy {
    /// The creator may edit only while the ticket waits in the pool.
    #[default]
    PendingOnly,
    /// The creator may edit at any status.
    Always,
}

#[derive(Debug, Clone)]
pub struct DeskOptions {
    /// How long a writer waits for another worker's transaction to finish.
    pub busy_timeout: Duration,
    pub edit_policy: EditPolicy,
}

impl Default for DeskOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            edit_policy: EditPolicy::default(),
        }
    }
}

pub struct TicketDesk {
    db: Connection,
    edit_policy: EditPolicy,
}

impl TicketDesk {
    /// Open or create the desk database at `path`, migrating it if needed.
    pub fn open(path: impl AsRef<Path>, options: &DeskOptions) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let db = open_secure_db(path, options.busy_timeout)?;
        let desk = Self::initialize(db, options.edit_policy)
            .with_context(|| format!("Failed to initialise desk at {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Opened ticket desk");
        Ok(desk)
    }

    /// Open a private in-memory desk (for testing).
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::initialize(open_memory_db()?, EditPolicy::default())
    }

    fn initialize(mut db: Connection, edit_policy: EditPolicy) -> anyhow::Result<Self> {
        schema::migrate(&mut db)?;
        Ok(Self { db, edit_policy })
    }

    pub fn set_edit_policy(&mut self, policy: EditPolicy) {
        self.edit_policy = policy;
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Tickets the responder may currently see or act on, newest first.
    pub fn list_assigned(&self, actor: &Actor) -> Result<Vec<Ticket>, DeskError> {
        actor.require(Role::Responder)?;
        Ok(assignment::visible_tickets(&self.db, actor.id)?)
    }

    /// Tickets the employee created, newest first, whatever their status.
    pub fn list_owned(&self, actor: &Actor) -> Result<Vec<Ticket>, DeskError> {
        actor.require(Role::Employee)?;
        Ok(tickets::list_by_creator(&self.db, actor.id)?)
    }

    /// Done tickets the responder completed and tickets they declined.
    ///
    /// Both lists are read from one snapshot.
    pub fn history(&self, actor: &Actor) -> Result<ResponderHistory, DeskError> {
        actor.require(Role::Responder)?;
        let snapshot = self
            .db
            .unchecked_transaction()
            .context("Failed to begin history read")?;
        let history = ResponderHistory {
            done: tickets::list_done_by(&snapshot, actor.id)?,
            declined: ledger::declined_by(&snapshot, actor.id)?,
        };
        snapshot.commit().context("Failed to end history read")?;
        Ok(history)
    }

    pub fn ticket(&self, id: TicketId) -> Result<Ticket, DeskError> {
        tickets::get(&self.db, id)?.ok_or(DeskError::NotFound)
    }

    /// Decline ledger rows for a ticket, including rows orphaned by deletion.
    pub fn declines(&self, id: TicketId) -> Result<Vec<DeclineEntry>, DeskError> {
        Ok(ledger::entries_for_ticket(&self.db, id)?)
    }

    pub fn inbox(&self, receiver: UserId) -> Result<Vec<Notification>, DeskError> {
        Ok(notify::inbox(&self.db, receiver)?)
    }

    pub fn unread_count(&self, receiver: UserId) -> Result<u64, DeskError> {
        Ok(notify::unread_count(&self.db, receiver)?)
    }

    // ── Transitions ─────────────────────────────────────────────────────

    pub fn create(&mut self, actor: &Actor, content: &TicketContent) -> Result<Ticket, DeskError> {
        actor.require(Role::Employee)?;
        let ticket = self.transact("create", |tx| {
            Ok(tickets::insert(tx, actor.id, content, now())?)
        })?;
        tracing::debug!(ticket_id = %ticket.id, creator_id = %actor.id, "Created ticket");
        Ok(ticket)
    }

    /// Take a pending ticket. Retrying a claim the responder already holds
    /// succeeds without changing anything.
    pub fn claim(&mut self, actor: &Actor, id: TicketId) -> Result<Ticket, DeskError> {
        actor.require(Role::Responder)?;
        let responder = actor.id;
        let result = self.transact("claim", |tx| {
            if ledger::has_declined(tx, id, responder)? {
                return Err(absent_or(tx, id, DeskError::Forbidden));
            }
            if !tickets::claim(tx, id, responder)? {
                return Err(absent_or(tx, id, DeskError::Conflict));
            }
            tickets::get(tx, id)?.ok_or(DeskError::NotFound)
        });
        log_transition("claim", id, responder, &result);
        result
    }

    /// Record a permanent refusal and, if the responder was working the
    /// ticket, hand it back to the pool. Always safe to retry.
    pub fn decline(&mut self, actor: &Actor, id: TicketId) -> Result<DeclineOutcome, DeskError> {
        actor.require(Role::Responder)?;
        let responder = actor.id;
        let outcome = self.transact("decline", |tx| {
            let entry = ledger::record_decline(tx, id, responder, now())?;
            let released = tickets::release(tx, id, responder)?;
            Ok(DeclineOutcome { entry, released })
        })?;

        if outcome.released {
            tracing::info!(ticket_id = %id, responder_id = %responder, "Ticket released back to pool");
        } else {
            tracing::debug!(ticket_id = %id, responder_id = %responder, "Decline recorded");
        }
        Ok(outcome)
    }

    /// Mark a ticket done. Only the current holder may complete an assigned
    /// ticket; an unassigned ticket may be completed by any responder who
    /// has not declined it.
    pub fn complete(&mut self, actor: &Actor, id: TicketId) -> Result<Ticket, DeskError> {
        actor.require(Role::Responder)?;
        let responder = actor.id;
        let result = self.transact("complete", |tx| {
            if ledger::has_declined(tx, id, responder)? {
                return Err(absent_or(tx, id, DeskError::Forbidden));
            }
            if tickets::complete(tx, id, responder, now())? {
                return tickets::get(tx, id)?.ok_or(DeskError::NotFound);
            }
            match tickets::get(tx, id)? {
                None => Err(DeskError::NotFound),
                // Retried completion by the same responder.
                Some(ticket)
                    if ticket.status == TicketStatus::Done && ticket.responder == Some(responder) =>
                {
                    Ok(ticket)
                }
                Some(_) => Err(DeskError::Conflict),
            }
        });
        log_transition("complete", id, responder, &result);
        result
    }

    /// Replace a ticket's title and description. Creator only.
    pub fn edit_content(
        &mut self,
        actor: &Actor,
        id: TicketId,
        content: &TicketContent,
    ) -> Result<Ticket, DeskError> {
        actor.require(Role::Employee)?;
        let policy = self.edit_policy;
        self.transact("edit", |tx| {
            let Some(ticket) = tickets::get_owned(tx, id, actor.id)? else {
                return Err(DeskError::Forbidden);
            };
            if policy == EditPolicy::PendingOnly && ticket.status != TicketStatus::Pending {
                tracing::debug!(ticket_id = %id, status = %ticket.status, "Edit refused after claim");
                return Err(DeskError::Forbidden);
            }
            if !tickets::update_content(tx, id, actor.id, content)? {
                return Err(DeskError::Forbidden);
            }
            Ok(Ticket {
                title: content.title.as_str().to_string(),
                description: content.description.as_str().to_string(),
                ..ticket
            })
        })
    }

    /// Remove a ticket. Creator only; a ticket the caller does not own is
    /// reported as missing.
    ///
    /// A responder who was working on (or had finished) the ticket gets one
    /// alert, written in the same transaction as the delete.
    pub fn delete(&mut self, actor: &Actor, id: TicketId) -> Result<DeleteOutcome, DeskError> {
        actor.require(Role::Employee)?;
        let outcome = self.transact("delete", |tx| {
            let Some(ticket) = tickets::get_owned(tx, id, actor.id)? else {
                return Err(DeskError::NotFound);
            };
            let alert = if ticket.responder.is_some() && ticket.status.is_assigned() {
                Some(notify::emit_deletion_alert(tx, &ticket, actor, now())?)
            } else {
                None
            };
            if !tickets::delete(tx, id, actor.id)? {
                return Err(DeskError::NotFound);
            }
            Ok(DeleteOutcome { ticket, alert })
        })?;

        match &outcome.alert {
            Some(alert) => tracing::info!(
                ticket_id = %id,
                responder_id = %alert.receiver,
                status = %outcome.ticket.status,
                "Deleted assigned ticket; responder alerted"
            ),
            None => tracing::debug!(ticket_id = %id, "Deleted unassigned ticket"),
        }
        Ok(outcome)
    }

    /// Run `body` in one IMMEDIATE transaction. Any error rolls back.
    fn transact<T>(
        &mut self,
        op: &'static str,
        body: impl FnOnce(&Transaction<'_>) -> Result<T, DeskError>,
    ) -> Result<T, DeskError> {
        let tx = self
            .db
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .with_context(|| format!("Failed to begin {op} transaction"))?;
        let value = body(&tx)?;
        tx.commit()
            .with_context(|| format!("Failed to commit {op} transaction"))?;
        Ok(value)
    }
}

/// `NotFound` when the ticket is gone, otherwise `err`.
fn absent_or(db: &Connection, id: TicketId, err: DeskError) -> DeskError {
    match tickets::get(db, id) {
        Ok(Some(_)) => err,
        Ok(None) => DeskError::NotFound,
        Err(storage) => DeskError::Storage(storage),
    }
}

fn log_transition(op: &'static str, id: TicketId, responder: UserId, result: &Result<Ticket, DeskError>) {
    match result {
        Ok(ticket) => {
            tracing::debug!(op, ticket_id = %id, responder_id = %responder, status = %ticket.status, "Transition applied");
        }
        Err(DeskError::Conflict) => {
            tracing::warn!(op, ticket_id = %id, responder_id = %responder, "Lost race for ticket");
        }
        Err(err) if err.is_recoverable() => {
            tracing::debug!(op, ticket_id = %id, responder_id = %responder, %err, "Transition refused");
        }
        Err(err) => {
            tracing::error!(op, ticket_id = %id, responder_id = %responder, %err, "Transition failed");
        }
    }
}
