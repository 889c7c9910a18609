//! Drives the `helpdesk` binary the way an operator would.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

struct Session {
    home: TempDir,
}

impl Session {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().expect("temp home"),
        }
    }

    fn db(&self) -> std::path::PathBuf {
        self.home.path().join("helpdesk.db")
    }

    fn run(&self, actor: &str, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_helpdesk"))
            .env("HOME", self.home.path())
            .env_remove("HELPDESK_CONFIG")
            .env("RUST_LOG", "debug")
            .current_dir(self.home.path())
            .arg("--db")
            .arg(self.db())
            .args(["--as", actor])
            .args(args)
            .output()
            .expect("spawn helpdesk")
    }

    fn json(&self, actor: &str, args: &[&str]) -> Value {
        let output = self.run(actor, args);
        assert!(
            output.status.success(),
            "helpdesk {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("json output")
    }
}

const DANA: &str = "1:employee:Dana";
const RAE: &str = "10:responder:Rae";
const SAM: &str = "11:responder:Sam";

#[test]
fn full_ticket_flow_through_binary() {
    let session = Session::new();

    let created = session.json(DANA, &["create", "--title", "VPN", "--description", "Drops hourly"]);
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_i64().unwrap().to_string();

    let claimed = session.json(RAE, &["claim", &id]);
    assert_eq!(claimed["status"], "in_process");
    assert_eq!(claimed["responder"], 10);

    let conflict = session.run(SAM, &["claim", &id]);
    assert_eq!(conflict.status.code(), Some(5));

    let declined = session.json(RAE, &["decline", &id]);
    assert_eq!(declined["released"], true);

    let assigned = session.json(RAE, &["assigned"]);
    assert_eq!(assigned, Value::Array(vec![]));

    session.json(SAM, &["claim", &id]);
    let deleted = session.json(DANA, &["delete", &id]);
    assert_eq!(deleted["alert"]["receiver"], 11);

    let inbox = session.json(SAM, &["inbox"]);
    assert_eq!(inbox["unread"], 1);
    assert_eq!(inbox["notifications"][0]["subject"], "Ticket deleted alert");

    let missing = session.run(DANA, &["show", &id]);
    assert_eq!(missing.status.code(), Some(3));
}

#[test]
fn history_reports_done_and_declined() {
    let session = Session::new();
    let fixed = session.json(DANA, &["create", "--title", "Fixed", "--description", "d"]);
    let refused = session.json(DANA, &["create", "--title", "Refused", "--description", "d"]);
    let fixed = fixed["id"].as_i64().unwrap().to_string();
    let refused = refused["id"].as_i64().unwrap().to_string();

    session.json(RAE, &["claim", &fixed]);
    session.json(RAE, &["complete", &fixed]);
    session.json(RAE, &["decline", &refused]);

    let history = session.json(RAE, &["history"]);
    assert_eq!(history["done"][0]["title"], "Fixed");
    assert_eq!(history["done"][0]["status"], "done");
    assert_eq!(history["declined"][0]["ticket"]["title"], "Refused");
    assert!(history["declined"][0]["declined_at"].is_string());

    let forbidden = session.run(DANA, &["history"]);
    assert_eq!(forbidden.status.code(), Some(4));
}

#[test]
fn wrong_role_exits_forbidden() {
    let session = Session::new();
    let output = session.run(RAE, &["create", "--title", "x", "--description", "y"]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn empty_title_is_rejected() {
    let session = Session::new();
    let output = session.run(DANA, &["create", "--title", "", "--description", "y"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("must not be empty"));
}

#[test]
fn logs_go_to_home_log_file() {
    let session = Session::new();
    session.json(DANA, &["owned"]);
    let log = session.home.path().join(".helpdesk").join("logs").join("helpdesk.log");
    assert!(Path::new(&log).exists());
    assert!(std::fs::read_to_string(log).unwrap().contains("Opened ticket desk"));
}

#[test]
fn config_file_supplies_database_path() {
    let session = Session::new();
    let config = session.home.path().join("config.toml");
    let db = session.home.path().join("from-config.db");
    std::fs::write(&config, format!("[store]\npath = {:?}\n", db.display().to_string())).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_helpdesk"))
        .env("HOME", session.home.path())
        .env("HELPDESK_CONFIG", &config)
        .args(["--as", DANA, "create", "--title", "Cfg", "--description", "From config"])
        .output()
        .expect("spawn helpdesk");
    assert!(output.status.success());
    assert!(db.exists());
}
