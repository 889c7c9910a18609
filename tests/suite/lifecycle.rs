//! End-to-end ticket lifecycles against a file-backed desk.

use helpdesk_store::{CURRENT_SCHEMA_VERSION, DeskOptions, EditPolicy, TicketDesk};
use helpdesk_types::{DeskError, NotificationKind, TicketContent, TicketStatus};

use crate::common::{DeskFixture, employee, new_ticket, responder};

#[test]
fn state_survives_reopen() {
    let fixture = DeskFixture::new();
    let r1 = responder(10);
    let r2 = responder(11);

    let ticket = {
        let mut desk = fixture.open();
        let ticket = new_ticket(&mut desk, "VPN drops");
        desk.claim(&r1, ticket.id).unwrap();
        desk.decline(&r1, ticket.id).unwrap();
        ticket
    };

    let mut desk = fixture.open();
    assert!(desk.list_assigned(&r1).unwrap().is_empty());
    assert!(matches!(desk.claim(&r1, ticket.id), Err(DeskError::Forbidden)));
    let claimed = desk.claim(&r2, ticket.id).unwrap();
    assert_eq!(claimed.created_at, ticket.created_at);
}

#[test]
fn exclusion_is_permanent_across_reassignments() {
    let fixture = DeskFixture::new();
    let mut desk = fixture.open();
    let ticket = new_ticket(&mut desk, "Laptop fan");
    let r1 = responder(10);
    let r2 = responder(11);
    let r3 = responder(12);

    desk.claim(&r1, ticket.id).unwrap();
    desk.decline(&r1, ticket.id).unwrap();
    desk.claim(&r2, ticket.id).unwrap();
    desk.decline(&r2, ticket.id).unwrap();

    for declined in [&r1, &r2] {
        assert!(desk.list_assigned(declined).unwrap().is_empty());
    }
    let visible = desk.list_assigned(&r3).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].status, TicketStatus::Pending);
}

#[test]
fn listings_are_newest_first() {
    let fixture = DeskFixture::new();
    let mut desk = fixture.open();
    let first = new_ticket(&mut desk, "First");
    let second = new_ticket(&mut desk, "Second");
    let third = new_ticket(&mut desk, "Third");

    let owned: Vec<_> = desk
        .list_owned(&employee())
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(owned, vec![third.id, second.id, first.id]);

    let assigned: Vec<_> = desk
        .list_assigned(&responder(10))
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(assigned, owned);
}

#[test]
fn deletion_alert_is_sent_exactly_once() {
    let fixture = DeskFixture::new();
    let mut desk = fixture.open();
    let r1 = responder(10);
    let ticket = new_ticket(&mut desk, "Projector");
    desk.claim(&r1, ticket.id).unwrap();

    desk.delete(&employee(), ticket.id).unwrap();
    assert!(matches!(desk.delete(&employee(), ticket.id), Err(DeskError::NotFound)));

    let inbox = fixture.open().inbox(r1.id).unwrap();
    assert_eq!(inbox.len(), 1);
    let alert = &inbox[0];
    assert_eq!(alert.kind, NotificationKind::Alert);
    assert_eq!(alert.subject, "Ticket deleted alert");
    assert_eq!(
        alert.body,
        format!("Dana deleted this ticket #{} (Projector) while it was in process by you.", ticket.id)
    );
    assert!(!alert.is_read);
    assert_eq!(desk.unread_count(r1.id).unwrap(), 1);
}

#[test]
fn ticket_ids_are_not_reused_after_delete() {
    let fixture = DeskFixture::new();
    let mut desk = fixture.open();
    let doomed = new_ticket(&mut desk, "Temp");
    desk.delete(&employee(), doomed.id).unwrap();
    let next = new_ticket(&mut desk, "Next");
    assert!(next.id > doomed.id);
}

#[test]
fn edit_policy_from_options_applies() {
    let fixture = DeskFixture::new();
    let options = DeskOptions {
        edit_policy: EditPolicy::Always,
        ..DeskOptions::default()
    };
    let mut desk = TicketDesk::open(&fixture.path, &options).unwrap();
    let ticket = new_ticket(&mut desk, "Draft");
    desk.claim(&responder(10), ticket.id).unwrap();

    let edited = desk
        .edit_content(&employee(), ticket.id, &TicketContent::new("Final", "Details").unwrap())
        .unwrap();
    assert_eq!(edited.title, "Final");
    assert_eq!(fixture.open().ticket(ticket.id).unwrap().description, "Details");
}

#[test]
fn database_is_created_with_owner_only_permissions() {
    let fixture = DeskFixture::new();
    assert!(fixture.path.exists());
    assert!(CURRENT_SCHEMA_VERSION >= 1);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let file_mode = std::fs::metadata(&fixture.path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir = fixture.path.parent().unwrap();
        let dir_mode = std::fs::metadata(dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
    }
}

#[test]
fn responder_history_survives_reopen() {
    let fixture = DeskFixture::new();
    let r1 = responder(10);
    {
        let mut desk = fixture.open();
        let fixed = new_ticket(&mut desk, "Fixed");
        let refused = new_ticket(&mut desk, "Refused");
        desk.claim(&r1, fixed.id).unwrap();
        desk.complete(&r1, fixed.id).unwrap();
        desk.decline(&r1, refused.id).unwrap();
    }

    let history = fixture.open().history(&r1).unwrap();
    assert_eq!(history.done.len(), 1);
    assert_eq!(history.done[0].title, "Fixed");
    assert!(history.done[0].completed_at.is_some());
    assert_eq!(history.declined.len(), 1);
    assert_eq!(history.declined[0].ticket.title, "Refused");
}
