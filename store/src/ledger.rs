//! Decline Ledger - per-(ticket, responder) refusals.
//!
//! Rows are upserted, never deleted. A row outlives its ticket.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};

use helpdesk_types::{DeclineEntry, DeclineStatus, DeclinedTicket, TicketId, UserId};

use crate::sqlite_util::{timestamp_from_column, timestamp_to_column};
use crate::tickets::{TICKET_COLUMNS, TicketRow};

/// Record that `responder` declined `ticket`.
///
/// Idempotent on the `(ticket_id, responder_id)` key: a repeat refreshes the
/// timestamp and leaves a single row.
pub(crate) fn record_decline(
    tx: &Transaction<'_>,
    ticket: TicketId,
    responder: UserId,
    declined_at: DateTime<Utc>,
) -> Result<DeclineEntry> {
    let status = DeclineStatus::Declined;
    tx.execute(
        "INSERT INTO ticket_declines (ticket_id, responder_id, status, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(ticket_id, responder_id)
         DO UPDATE SET status = excluded.status, created_at = excluded.created_at",
        params![
            ticket.value(),
            responder.value(),
            status.as_str(),
            timestamp_to_column(declined_at)
        ],
    )
    .with_context(|| format!("Failed to record decline of ticket {ticket} by {responder}"))?;

    Ok(DeclineEntry {
        ticket,
        responder,
        status,
        created_at: declined_at,
    })
}

pub(crate) fn has_declined(db: &Connection, ticket: TicketId, responder: UserId) -> Result<bool> {
    let found = db
        .query_row(
            "SELECT 1 FROM ticket_declines
             WHERE ticket_id = ?1 AND responder_id = ?2 AND status = 'declined'",
            params![ticket.value(), responder.value()],
            |_| Ok(()),
        )
        .optional()
        .context("Failed to query decline ledger")?;
    Ok(found.is_some())
}

/// Every decline recorded against `ticket`, oldest first.
pub(crate) fn entries_for_ticket(db: &Connection, ticket: TicketId) -> Result<Vec<DeclineEntry>> {
    let mut stmt = db
        .prepare(
            "SELECT responder_id, status, created_at
             FROM ticket_declines
             WHERE ticket_id = ?1
             ORDER BY created_at ASC, responder_id ASC",
        )
        .context("Failed to prepare decline ledger query")?;

    let rows = stmt
        .query_map([ticket.value()], |row| {
            let responder: i64 = row.get(0)?;
            let status: String = row.get(1)?;
            let created_at: String = row.get(2)?;
            Ok((responder, status, created_at))
        })
        .context("Failed to query decline ledger")?;

    let mut entries = Vec::new();
    for row in rows {
        let (responder, status, created_at) = row.context("Failed to read decline row")?;
        entries.push(DeclineEntry {
            ticket,
            responder: UserId::new(responder),
            status: status
                .parse()
                .with_context(|| format!("Corrupt decline status for ticket {ticket}"))?,
            created_at: timestamp_from_column(&created_at)?,
        });
    }
    Ok(entries)
}

/// Tickets `responder` declined that still exist, most recent decline first.
pub(crate) fn declined_by(db: &Connection, responder: UserId) -> Result<Vec<DeclinedTicket>> {
    let mut stmt = db
        .prepare(&format!(
            "SELECT {TICKET_COLUMNS}, d.created_at
             FROM ticket_declines d
             JOIN tickets t ON t.id = d.ticket_id
             WHERE d.responder_id = ?1 AND d.status = 'declined'
             ORDER BY d.created_at DESC, t.id DESC"
        ))
        .context("Failed to prepare declined-tickets query")?;

    let rows = stmt
        .query_map([responder.value()], |row| {
            let ticket = TicketRow::from_row(row)?;
            let declined_at: String = row.get(8)?;
            Ok((ticket, declined_at))
        })
        .context("Failed to query declined tickets")?;

    let mut declined = Vec::new();
    for row in rows {
        let (ticket, declined_at) = row.context("Failed to read declined ticket row")?;
        declined.push(DeclinedTicket {
            ticket: ticket.into_ticket()?,
            declined_at: timestamp_from_column(&declined_at)?,
        });
    }
    Ok(declined)
}
