//! # AppError
//!
//! Centralized error handling for the Loffle ecosystem.
//! Maps domain-specific failures to actionable error types.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Progress;

/// The primary error type for all lf-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Raffle, Ticket, Product)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// The user already holds an active application on this raffle
    #[error("user has already applied to this raffle")]
    AlreadyApplied,

    /// The user's ticket balance (bought − used + returned) is exhausted
    #[error("user owns no tickets available to apply")]
    NoTicketsOwned,

    /// Applications are only admitted while the raffle is ongoing
    #[error("cannot apply to a raffle in <{0}> state")]
    InvalidRaffleState(Progress),

    /// The raffle already holds its target number of applications
    #[error("the application limit <{0}> has been reached")]
    RaffleFull(u32),

    /// Lottery-draw ingestion rejected before any resolution runs
    #[error("invalid draw date: {0}")]
    DrawDateInvalid(String),

    /// No draw result has been recorded yet for the raffle's announce date
    #[error("no lottery draw recorded for {0}")]
    DrawNotRecorded(NaiveDate),

    /// Winner resolution requested before the announce instant has passed
    #[error("announce date {0} has not passed yet")]
    AnnouncePending(DateTime<Utc>),

    /// Data-integrity fault in candidate block assignment; resolution for
    /// this raffle halts rather than guessing a winner
    #[error("sampling invariant violated for raffle {0}: {1}")]
    SamplingInvariant(Uuid, String),

    /// Validation failure (e.g., target quantity below 3, end before start)
    #[error("validation error: {0}")]
    Validation(String),

    /// Infrastructure failure (e.g., DB down, feed unreachable)
    #[error("internal service error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A specialized Result type for Loffle logic.
pub type Result<T> = std::result::Result<T, AppError>;
