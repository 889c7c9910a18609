//! Versioned schema for the desk database.

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, TransactionBehavior, params};

use crate::sqlite_util::{now, timestamp_to_column};

/// Migrations in order; entry `n` upgrades the schema to version `n + 1`.
const MIGRATIONS: &[&str] = &[V1_INITIAL];

pub const CURRENT_SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

// Ticket ids use AUTOINCREMENT so a deleted id is never handed out again;
// decline rows outlive their ticket and must not gate an unrelated one.
//
// ticket_declines and notifications carry no foreign key to tickets: both
// keep referencing a ticket after it is deleted.
const V1_INITIAL: &str = r"
    CREATE TABLE IF NOT EXISTS tickets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        creator_id INTEGER NOT NULL,
        responder_id INTEGER,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'in_process', 'done')),
        created_at TEXT NOT NULL,
        completed_at TEXT,
        CHECK ((responder_id IS NULL) = (status = 'pending')),
        CHECK ((completed_at IS NULL) = (status <> 'done'))
    );

    CREATE TABLE IF NOT EXISTS ticket_declines (
        ticket_id INTEGER NOT NULL,
        responder_id INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'declined' CHECK (status IN ('declined')),
        created_at TEXT NOT NULL,
        PRIMARY KEY (ticket_id, responder_id)
    );

    CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL CHECK (kind IN ('alert', 'direct')),
        sender_id INTEGER,
        receiver_id INTEGER NOT NULL,
        ticket_id INTEGER,
        subject TEXT NOT NULL,
        body TEXT NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_tickets_creator
    ON tickets(creator_id, created_at DESC);

    CREATE INDEX IF NOT EXISTS idx_tickets_pool
    ON tickets(status, responder_id);

    CREATE INDEX IF NOT EXISTS idx_ticket_declines_responder
    ON ticket_declines(responder_id);

    CREATE INDEX IF NOT EXISTS idx_notifications_receiver
    ON notifications(receiver_id, created_at DESC);
";

/// Bring the database up to [`CURRENT_SCHEMA_VERSION`].
///
/// Safe to run from several workers at once: each step re-reads the version
/// under the write lock before applying anything.
pub(crate) fn migrate(db: &mut Connection) -> Result<()> {
    db.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )
    .context("Failed to create schema_migrations table")?;

    let found = schema_version(db)?;
    if found > CURRENT_SCHEMA_VERSION {
        bail!(
            "Desk database schema version {found} is newer than supported version {CURRENT_SCHEMA_VERSION}"
        );
    }

    for (index, sql) in MIGRATIONS.iter().enumerate() {
        let version = index as u32 + 1;
        let tx = db
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to start migration transaction")?;
        if schema_version(&tx)? >= version {
            continue;
        }
        tx.execute_batch(sql)
            .with_context(|| format!("Failed to apply schema migration {version}"))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)
             ON CONFLICT(version) DO NOTHING",
            params![version, timestamp_to_column(now())],
        )
        .with_context(|| format!("Failed to record schema migration {version}"))?;
        tx.commit()
            .with_context(|| format!("Failed to commit schema migration {version}"))?;
        tracing::info!(version, "Applied desk schema migration");
    }

    Ok(())
}

pub(crate) fn schema_version(db: &Connection) -> Result<u32> {
    db.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .context("Failed to read schema version")
}
