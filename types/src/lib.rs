//! Core domain types for the helpdesk router.
//!
//! This crate contains pure domain types with no IO and minimal dependencies.
//! Everything here can be used from any layer of the application.

#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod actor;
mod error;
mod ids;
mod notification;
mod outcome;
mod proofs;
mod ticket;

pub use actor::{Actor, ActorParseError, Role};
pub use error::DeskError;
pub use ids::{NotificationId, TicketId, UserId};
pub use notification::{Notification, NotificationKind};
pub use outcome::{DeclineOutcome, DeclinedTicket, DeleteOutcome, ResponderHistory};
pub use proofs::{EmptyStringError, NonEmptyString, TicketContent};
pub use ticket::{DeclineEntry, DeclineStatus, Ticket, TicketStatus, UnknownStatus};
