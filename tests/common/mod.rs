//! Shared test utilities and fixtures
//!
//! Every helper works against a file-backed desk in a temp directory so
//! several connections (one per thread) can share it.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use helpdesk_store::{DeskOptions, TicketDesk};
use helpdesk_types::{Actor, Ticket, TicketContent, UserId};
use tempfile::TempDir;

pub const EMPLOYEE_ID: i64 = 1;

pub struct DeskFixture {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl DeskFixture {
    /// Create the database once up front so later connections skip migration.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("desk").join("helpdesk.db");
        TicketDesk::open(&path, &DeskOptions::default()).expect("initial open");
        Self { dir, path }
    }

    pub fn open(&self) -> TicketDesk {
        open_desk(&self.path)
    }
}

pub fn open_desk(path: &Path) -> TicketDesk {
    TicketDesk::open(path, &DeskOptions::default()).expect("open desk")
}

pub fn employee() -> Actor {
    Actor::employee(UserId::new(EMPLOYEE_ID), "Dana")
}

pub fn responder(id: i64) -> Actor {
    Actor::responder(UserId::new(id), format!("Responder {id}"))
}

pub fn new_ticket(desk: &mut TicketDesk, title: &str) -> Ticket {
    let content = TicketContent::new(title, "Reported via integration test").expect("content");
    desk.create(&employee(), &content).expect("create ticket")
}
