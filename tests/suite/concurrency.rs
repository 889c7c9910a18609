//! Races between workers sharing one desk database.
//!
//! Each thread opens its own connection, mirroring independent request
//! handlers, and waits on a barrier so the transitions start together.

use std::sync::{Arc, Barrier};
use std::thread;

use helpdesk_types::{DeskError, TicketStatus, UserId};

use crate::common::{DeskFixture, employee, new_ticket, responder};

const WORKERS: i64 = 8;

#[test]
fn simultaneous_claims_have_exactly_one_winner() {
    let fixture = DeskFixture::new();
    let ticket = new_ticket(&mut fixture.open(), "Network down");
    let barrier = Arc::new(Barrier::new(WORKERS as usize));

    let handles: Vec<_> = (0..WORKERS)
        .map(|n| {
            let path = fixture.path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut desk = crate::common::open_desk(&path);
                let actor = responder(100 + n);
                barrier.wait();
                (actor.id, desk.claim(&actor, ticket.id))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<UserId> = results
        .iter()
        .filter_map(|(id, result)| result.as_ref().ok().map(|_| *id))
        .collect();
    assert_eq!(winners.len(), 1, "exactly one claim must succeed");
    for (_, result) in &results {
        if let Err(err) = result {
            assert!(matches!(err, DeskError::Conflict), "loser saw {err:?}");
        }
    }

    let stored = fixture.open().ticket(ticket.id).unwrap();
    assert_eq!(stored.status, TicketStatus::InProcess);
    assert_eq!(stored.responder, Some(winners[0]));
}

#[test]
fn concurrent_duplicate_declines_record_one_entry() {
    let fixture = DeskFixture::new();
    let mut desk = fixture.open();
    let ticket = new_ticket(&mut desk, "Printer jam");
    let holder = responder(10);
    desk.claim(&holder, ticket.id).unwrap();
    drop(desk);

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = fixture.path.clone();
            let barrier = Arc::clone(&barrier);
            let holder = holder.clone();
            thread::spawn(move || {
                let mut desk = crate::common::open_desk(&path);
                barrier.wait();
                desk.decline(&holder, ticket.id)
            })
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().expect("decline never fails"))
        .collect();
    assert_eq!(outcomes.iter().filter(|o| o.released).count(), 1);

    let desk = fixture.open();
    assert_eq!(desk.declines(ticket.id).unwrap().len(), 1);
    let stored = desk.ticket(ticket.id).unwrap();
    assert_eq!(stored.status, TicketStatus::Pending);
    assert_eq!(stored.responder, None);
}

#[test]
fn decline_racing_claim_never_leaves_decliner_holding() {
    let fixture = DeskFixture::new();
    let mut desk = fixture.open();
    let ticket = new_ticket(&mut desk, "Access badge");
    let r1 = responder(20);
    let r2 = responder(21);
    desk.claim(&r1, ticket.id).unwrap();
    drop(desk);

    let barrier = Arc::new(Barrier::new(3));
    let spawn_desk = |f: Box<dyn FnOnce(&mut helpdesk_store::TicketDesk) + Send>| {
        let path = fixture.path.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let mut desk = crate::common::open_desk(&path);
            barrier.wait();
            f(&mut desk);
        })
    };

    let (a1, a2, b) = (r1.clone(), r1.clone(), r2.clone());
    let handles = [
        spawn_desk(Box::new(move |desk| {
            desk.decline(&a1, ticket.id).unwrap();
        })),
        spawn_desk(Box::new(move |desk| {
            // Forbidden once the decline lands, otherwise a no-op retry.
            let _ = desk.claim(&a2, ticket.id);
        })),
        spawn_desk(Box::new(move |desk| {
            let _ = desk.claim(&b, ticket.id);
        })),
    ];
    for handle in handles {
        handle.join().unwrap();
    }

    let desk = fixture.open();
    let stored = desk.ticket(ticket.id).unwrap();
    assert_ne!(stored.responder, Some(r1.id));
    assert!(stored.is_consistent());
    assert!(desk.list_assigned(&r1).unwrap().is_empty());
}

#[test]
fn delete_racing_claim_alerts_only_when_claim_won() {
    for round in 0..5 {
        let fixture = DeskFixture::new();
        let ticket = new_ticket(&mut fixture.open(), &format!("Round {round}"));
        let r1 = responder(30);
        let barrier = Arc::new(Barrier::new(2));

        let claimer = {
            let path = fixture.path.clone();
            let barrier = Arc::clone(&barrier);
            let r1 = r1.clone();
            thread::spawn(move || {
                let mut desk = crate::common::open_desk(&path);
                barrier.wait();
                desk.claim(&r1, ticket.id)
            })
        };
        let deleter = {
            let path = fixture.path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut desk = crate::common::open_desk(&path);
                barrier.wait();
                desk.delete(&employee(), ticket.id)
            })
        };

        let claim = claimer.join().unwrap();
        let deleted = deleter.join().unwrap().expect("creator delete succeeds");

        let inbox = fixture.open().inbox(r1.id).unwrap();
        match claim {
            Ok(_) => {
                assert_eq!(inbox.len(), 1);
                assert_eq!(deleted.alert.as_ref(), Some(&inbox[0]));
            }
            Err(err) => {
                assert!(matches!(err, DeskError::NotFound));
                assert!(inbox.is_empty());
                assert!(deleted.alert.is_none());
            }
        }
    }
}

#[test]
fn claim_racing_complete_has_exactly_one_winner() {
    for round in 0..10 {
        let fixture = DeskFixture::new();
        let ticket = new_ticket(&mut fixture.open(), &format!("Race {round}"));
        let claimer_actor = responder(40);
        let completer_actor = responder(41);
        let barrier = Arc::new(Barrier::new(2));

        let claimer = {
            let path = fixture.path.clone();
            let barrier = Arc::clone(&barrier);
            let actor = claimer_actor.clone();
            thread::spawn(move || {
                let mut desk = crate::common::open_desk(&path);
                barrier.wait();
                desk.claim(&actor, ticket.id)
            })
        };
        let completer = {
            let path = fixture.path.clone();
            let barrier = Arc::clone(&barrier);
            let actor = completer_actor.clone();
            thread::spawn(move || {
                let mut desk = crate::common::open_desk(&path);
                barrier.wait();
                desk.complete(&actor, ticket.id)
            })
        };

        let claim = claimer.join().unwrap();
        let complete = completer.join().unwrap();
        assert!(
            claim.is_ok() != complete.is_ok(),
            "exactly one of claim/complete must win: claim={claim:?} complete={complete:?}"
        );

        let stored = fixture.open().ticket(ticket.id).unwrap();
        assert!(stored.is_consistent());
        if claim.is_ok() {
            assert!(matches!(complete, Err(DeskError::Conflict)));
            assert_eq!(stored.status, TicketStatus::InProcess);
            assert_eq!(stored.responder, Some(claimer_actor.id));
        } else {
            assert!(matches!(claim, Err(DeskError::Conflict)));
            assert_eq!(stored.status, TicketStatus::Done);
            assert_eq!(stored.responder, Some(completer_actor.id));
        }
    }
}
