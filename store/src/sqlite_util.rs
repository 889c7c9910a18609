//! Shared SQLite helpers for the desk database.
//!
//! This module is the single place that knows how to:
//! - create the database directory and file with owner-only permissions
//! - apply the connection pragmas every desk connection runs with
//! - encode timestamps as sortable TEXT columns and decode them back

use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::Connection;

/// Open the desk database at `path`, creating it with secure permissions.
pub(crate) fn open_secure_db(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_secure_dir(parent)?;
    }
    ensure_secure_db_file(path)?;

    let db = Connection::open(path)
        .with_context(|| format!("Failed to open desk database at {}", path.display()))?;
    configure(&db, busy_timeout)?;
    Ok(db)
}

/// Open a private in-memory database (tests and dry runs).
pub(crate) fn open_memory_db() -> Result<Connection> {
    let db = Connection::open_in_memory().context("Failed to open in-memory desk database")?;
    configure(&db, Duration::ZERO)?;
    Ok(db)
}

fn configure(db: &Connection, busy_timeout: Duration) -> Result<()> {
    // Must precede the pragmas: switching to WAL takes a lock that another
    // worker may be holding.
    db.busy_timeout(busy_timeout)
        .context("Failed to set busy timeout")?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")
        .context("Failed to set desk database pragmas")
}

/// Create `path` (and parents) and restrict it to the current user.
///
/// Directories owned by someone else are left untouched.
pub(crate) fn ensure_secure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to read directory metadata: {}", path.display()))?;
        let our_uid = unsafe { libc::getuid() };
        if metadata.uid() == our_uid && metadata.permissions().mode() & 0o077 != 0 {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).with_context(
                || format!("Failed to set directory permissions: {}", path.display()),
            )?;
        }
    }
    Ok(())
}

/// Create the database file as 0o600 if missing and tighten it (and any WAL
/// sidecars) if it already exists.
fn ensure_secure_db_file(path: &Path) -> Result<()> {
    if !path.exists() {
        let mut options = OpenOptions::new();
        options.create(true).truncate(false).read(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options
            .open(path)
            .with_context(|| format!("Failed to create database file: {}", path.display()))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set database permissions: {}", path.display()))?;
        for sidecar in [sidecar_path(path, "-wal"), sidecar_path(path, "-shm")] {
            if sidecar.exists() {
                let _ = std::fs::set_permissions(&sidecar, std::fs::Permissions::from_mode(0o600));
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn sidecar_path(path: &Path, suffix: &str) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    std::path::PathBuf::from(name)
}

// ── Timestamps ──────────────────────────────────────────────────────────

/// Current time truncated to the precision the store persists.
///
/// Values handed back to callers must compare equal to what a later read
/// returns, so sub-microsecond digits are dropped up front.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 (`2025-01-01T00:00:00.000000Z`); lexical order of the
/// column equals chronological order.
pub(crate) fn timestamp_to_column(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn timestamp_from_column(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp in database: {raw:?}"))
}
