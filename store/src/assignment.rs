//! Assignment View - which tickets a responder may currently see.
//!
//! A ticket is visible to responder R when it is not done, is either
//! unassigned or assigned to R, and R has no decline on record for it.

use anyhow::Result;
use rusqlite::Connection;

use helpdesk_types::{Ticket, UserId};

use crate::tickets::{TICKET_COLUMNS, query_tickets};

/// Tickets visible to `responder`, newest first.
///
/// A single statement, so SQLite evaluates it against one consistent
/// snapshot even outside an explicit transaction.
pub(crate) fn visible_tickets(db: &Connection, responder: UserId) -> Result<Vec<Ticket>> {
    query_tickets(
        db,
        &format!(
            "SELECT {TICKET_COLUMNS} FROM tickets t
             WHERE t.status <> 'done'
               AND (t.responder_id IS NULL OR t.responder_id = ?1)
               AND NOT EXISTS (
                   SELECT 1 FROM ticket_declines d
                   WHERE d.ticket_id = t.id
                     AND d.responder_id = ?1
                     AND d.status = 'declined'
               )
             ORDER BY t.created_at DESC, t.id DESC"
        ),
        [responder.value()],
    )
}
