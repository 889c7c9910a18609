//! Ticket Store - the durable record of tickets and their current state.
//!
//! Every mutating function takes the caller's open [`Transaction`]; status
//! changes are written as conditional updates and report whether a row
//! matched, so the engine can tell a lost race from a success.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

use helpdesk_types::{Ticket, TicketContent, TicketId, TicketStatus, UserId};

use crate::sqlite_util::{timestamp_from_column, timestamp_to_column};

pub(crate) const TICKET_COLUMNS: &str =
    "t.id, t.creator_id, t.responder_id, t.status, t.title, t.description, t.created_at, t.completed_at";

/// Raw column values, decoded into a [`Ticket`] outside the rusqlite callback.
///
/// Reads the first eight columns in [`TICKET_COLUMNS`] order; queries may
/// append extra columns after them.
pub(crate) struct TicketRow {
    id: i64,
    creator_id: i64,
    responder_id: Option<i64>,
    status: String,
    title: String,
    description: String,
    created_at: String,
    completed_at: Option<String>,
}

impl TicketRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            creator_id: row.get(1)?,
            responder_id: row.get(2)?,
            status: row.get(3)?,
            title: row.get(4)?,
            description: row.get(5)?,
            created_at: row.get(6)?,
            completed_at: row.get(7)?,
        })
    }

    pub(crate) fn into_ticket(self) -> Result<Ticket> {
        let status: TicketStatus = self
            .status
            .parse()
            .with_context(|| format!("Corrupt status on ticket {}", self.id))?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(timestamp_from_column)
            .transpose()?;
        Ok(Ticket {
            id: TicketId::new(self.id),
            creator: UserId::new(self.creator_id),
            responder: self.responder_id.map(UserId::new),
            status,
            title: self.title,
            description: self.description,
            created_at: timestamp_from_column(&self.created_at)?,
            completed_at,
        })
    }
}

/// Run a ticket query and decode every row.
pub(crate) fn query_tickets(
    db: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Ticket>> {
    let mut stmt = db
        .prepare(sql)
        .context("Failed to prepare ticket query")?;
    let rows = stmt
        .query_map(params, TicketRow::from_row)
        .context("Failed to query tickets")?;

    let mut tickets = Vec::new();
    for row in rows {
        let row = row.context("Failed to read ticket row")?;
        tickets.push(row.into_ticket()?);
    }
    Ok(tickets)
}

pub(crate) fn insert(
    tx: &Transaction<'_>,
    creator: UserId,
    content: &TicketContent,
    created_at: DateTime<Utc>,
) -> Result<Ticket> {
    tx.execute(
        "INSERT INTO tickets (creator_id, title, description, status, created_at)
         VALUES (?1, ?2, ?3, 'pending', ?4)",
        params![
            creator.value(),
            content.title.as_str(),
            content.description.as_str(),
            timestamp_to_column(created_at)
        ],
    )
    .context("Failed to insert ticket")?;

    Ok(Ticket {
        id: TicketId::new(tx.last_insert_rowid()),
        creator,
        responder: None,
        status: TicketStatus::Pending,
        title: content.title.as_str().to_string(),
        description: content.description.as_str().to_string(),
        created_at,
        completed_at: None,
    })
}

pub(crate) fn get(db: &Connection, id: TicketId) -> Result<Option<Ticket>> {
    let row = db
        .query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets t WHERE t.id = ?1"),
            [id.value()],
            TicketRow::from_row,
        )
        .optional()
        .with_context(|| format!("Failed to load ticket {id}"))?;
    row.map(TicketRow::into_ticket).transpose()
}

/// Load a ticket only if `creator` owns it.
pub(crate) fn get_owned(db: &Connection, id: TicketId, creator: UserId) -> Result<Option<Ticket>> {
    let row = db
        .query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets t WHERE t.id = ?1 AND t.creator_id = ?2"),
            params![id.value(), creator.value()],
            TicketRow::from_row,
        )
        .optional()
        .with_context(|| format!("Failed to load ticket {id}"))?;
    row.map(TicketRow::into_ticket).transpose()
}

/// All tickets created by `creator`, newest first.
pub(crate) fn list_by_creator(db: &Connection, creator: UserId) -> Result<Vec<Ticket>> {
    query_tickets(
        db,
        &format!(
            "SELECT {TICKET_COLUMNS} FROM tickets t
             WHERE t.creator_id = ?1
             ORDER BY t.created_at DESC, t.id DESC"
        ),
        [creator.value()],
    )
}

/// Tickets `responder` finished, newest first.
pub(crate) fn list_done_by(db: &Connection, responder: UserId) -> Result<Vec<Ticket>> {
    query_tickets(
        db,
        &format!(
            "SELECT {TICKET_COLUMNS} FROM tickets t
             WHERE t.responder_id = ?1 AND t.status = 'done'
             ORDER BY t.created_at DESC, t.id DESC"
        ),
        [responder.value()],
    )
}

/// Compare-and-swap `pending -> in_process`.
///
/// Also matches a ticket the responder already holds, so a retried claim is a
/// no-op rather than a conflict. Returns whether a row matched.
pub(crate) fn claim(tx: &Transaction<'_>, id: TicketId, responder: UserId) -> Result<bool> {
    let changed = tx
        .execute(
            "UPDATE tickets
             SET status = 'in_process',
                 responder_id = ?2,
                 completed_at = NULL
             WHERE id = ?1
               AND (status = 'pending'
                    OR (status = 'in_process' AND responder_id = ?2))",
            params![id.value(), responder.value()],
        )
        .with_context(|| format!("Failed to claim ticket {id}"))?;
    Ok(changed > 0)
}

/// Return a ticket to the pool if `responder` holds it `in_process`.
pub(crate) fn release(tx: &Transaction<'_>, id: TicketId, responder: UserId) -> Result<bool> {
    let changed = tx
        .execute(
            "UPDATE tickets
             SET status = 'pending',
                 responder_id = NULL,
                 completed_at = NULL
             WHERE id = ?1
               AND responder_id = ?2
               AND status = 'in_process'",
            params![id.value(), responder.value()],
        )
        .with_context(|| format!("Failed to release ticket {id}"))?;
    Ok(changed > 0)
}

/// Compare-and-swap to `done`, allowed when the ticket is unowned or owned by
/// `responder` and not already done.
pub(crate) fn complete(
    tx: &Transaction<'_>,
    id: TicketId,
    responder: UserId,
    completed_at: DateTime<Utc>,
) -> Result<bool> {
    let changed = tx
        .execute(
            "UPDATE tickets
             SET status = 'done',
                 responder_id = ?2,
                 completed_at = ?3
             WHERE id = ?1
               AND status <> 'done'
               AND (responder_id IS NULL OR responder_id = ?2)",
            params![id.value(), responder.value(), timestamp_to_column(completed_at)],
        )
        .with_context(|| format!("Failed to complete ticket {id}"))?;
    Ok(changed > 0)
}

/// Replace title and description. Never touches status or responder.
pub(crate) fn update_content(
    tx: &Transaction<'_>,
    id: TicketId,
    creator: UserId,
    content: &TicketContent,
) -> Result<bool> {
    let changed = tx
        .execute(
            "UPDATE tickets SET title = ?3, description = ?4
             WHERE id = ?1 AND creator_id = ?2",
            params![
                id.value(),
                creator.value(),
                content.title.as_str(),
                content.description.as_str()
            ],
        )
        .with_context(|| format!("Failed to edit ticket {id}"))?;
    Ok(changed > 0)
}

pub(crate) fn delete(tx: &Transaction<'_>, id: TicketId, creator: UserId) -> Result<bool> {
    let changed = tx
        .execute(
            "DELETE FROM tickets WHERE id = ?1 AND creator_id = ?2",
            params![id.value(), creator.value()],
        )
        .with_context(|| format!("Failed to delete ticket {id}"))?;
    Ok(changed > 0)
}
