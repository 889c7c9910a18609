//! Notification Emitter - inbox records produced by desk transitions.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, params};

use helpdesk_types::{Actor, Notification, NotificationId, NotificationKind, Ticket, TicketId, UserId};

use crate::sqlite_util::{timestamp_from_column, timestamp_to_column};

pub(crate) const DELETION_ALERT_SUBJECT: &str = "Ticket deleted alert";

/// Subject and body of the alert sent when `actor` deletes `ticket`.
#[must_use]
pub fn deletion_alert_text(ticket: &Ticket, actor: &Actor) -> (String, String) {
    let body = format!(
        "{} deleted this ticket #{} ({}) while it was {} by you.",
        actor.name,
        ticket.id,
        ticket.title,
        ticket.status.label()
    );
    (DELETION_ALERT_SUBJECT.to_string(), body)
}

/// Append one alert addressed to the ticket's current responder.
///
/// Must run inside the transaction that deletes the ticket, so the alert is
/// committed exactly when the delete is.
pub(crate) fn emit_deletion_alert(
    tx: &Transaction<'_>,
    ticket: &Ticket,
    actor: &Actor,
    created_at: DateTime<Utc>,
) -> Result<Notification> {
    let Some(receiver) = ticket.responder else {
        bail!("Ticket {} has no responder to alert", ticket.id);
    };
    let (subject, body) = deletion_alert_text(ticket, actor);
    let kind = NotificationKind::Alert;

    tx.execute(
        "INSERT INTO notifications
            (kind, sender_id, receiver_id, ticket_id, subject, body, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
        params![
            kind.as_str(),
            actor.id.value(),
            receiver.value(),
            ticket.id.value(),
            &subject,
            &body,
            timestamp_to_column(created_at)
        ],
    )
    .with_context(|| format!("Failed to write deletion alert for ticket {}", ticket.id))?;

    Ok(Notification {
        id: NotificationId::new(tx.last_insert_rowid()),
        kind,
        sender: Some(actor.id),
        receiver,
        ticket: Some(ticket.id),
        subject,
        body,
        is_read: false,
        created_at,
    })
}

/// Notifications addressed to `receiver`, newest first.
pub(crate) fn inbox(db: &Connection, receiver: UserId) -> Result<Vec<Notification>> {
    let mut stmt = db
        .prepare(
            "SELECT id, kind, sender_id, ticket_id, subject, body, is_read, created_at
             FROM notifications
             WHERE receiver_id = ?1
             ORDER BY created_at DESC, id DESC",
        )
        .context("Failed to prepare inbox query")?;

    let rows = stmt
        .query_map([receiver.value()], |row| {
            let id: i64 = row.get(0)?;
            let kind: String = row.get(1)?;
            let sender: Option<i64> = row.get(2)?;
            let ticket: Option<i64> = row.get(3)?;
            let subject: String = row.get(4)?;
            let body: String = row.get(5)?;
            let is_read: bool = row.get(6)?;
            let created_at: String = row.get(7)?;
            Ok((id, kind, sender, ticket, subject, body, is_read, created_at))
        })
        .context("Failed to query inbox")?;

    let mut notifications = Vec::new();
    for row in rows {
        let (id, kind, sender, ticket, subject, body, is_read, created_at) =
            row.context("Failed to read notification row")?;
        notifications.push(Notification {
            id: NotificationId::new(id),
            kind: kind
                .parse()
                .with_context(|| format!("Corrupt kind on notification {id}"))?,
            sender: sender.map(UserId::new),
            receiver,
            ticket: ticket.map(TicketId::new),
            subject,
            body,
            is_read,
            created_at: timestamp_from_column(&created_at)?,
        });
    }
    Ok(notifications)
}

pub(crate) fn unread_count(db: &Connection, receiver: UserId) -> Result<u64> {
    let count: i64 = db
        .query_row(
            "SELECT COUNT(*) FROM notifications WHERE receiver_id = ?1 AND is_read = 0",
            [receiver.value()],
            |row| row.get(0),
        )
        .context("Failed to count unread notifications")?;
    Ok(count as u64)
}
