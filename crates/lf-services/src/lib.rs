//! loffle/crates/lf-services/src/lib.rs
//!
//! Application services orchestrating the lf-core ports. Every operation
//! takes its actor and clock explicitly — `(raffle_id, user_id, now)` — so
//! the whole raffle lifecycle is testable without an HTTP layer or a real
//! clock.

pub mod raffle_service;
pub mod ticket_service;

pub use raffle_service::{NewRaffle, RaffleService};
pub use ticket_service::TicketService;
