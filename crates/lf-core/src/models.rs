//! # Domain Models
//!
//! These structs represent the core entities of Loffle.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a raffle.
///
/// Transitions only move forward: waiting → ongoing → done, or ongoing →
/// failed once the end date passes without the target being met. `done` and
/// `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Progress {
    Waiting,
    Ongoing,
    Done,
    Failed,
}

impl Progress {
    pub fn as_str(&self) -> &'static str {
        match self {
            Progress::Waiting => "waiting",
            Progress::Ongoing => "ongoing",
            Progress::Done => "done",
            Progress::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Progress::Done | Progress::Failed)
    }

    /// Listing rank: ongoing raffles first, then waiting, then finished ones.
    pub fn rank(&self) -> i64 {
        match self {
            Progress::Ongoing => 1,
            Progress::Waiting => 2,
            Progress::Done => 3,
            Progress::Failed => 4,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Progress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Progress::Waiting),
            "ongoing" => Ok(Progress::Ongoing),
            "done" => Ok(Progress::Done),
            "failed" => Ok(Progress::Failed),
            other => Err(format!("unknown progress value: {other}")),
        }
    }
}

/// Immutable catalog item entitling its buyer to `quantity` raffle
/// applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub quantity: u32,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(quantity: u32, price: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            quantity,
            price,
            created_at: now,
        }
    }
}

/// A user's purchase of one ticket. Never mutated after creation;
/// soft-deleted at most.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketPurchase {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl TicketPurchase {
    pub fn new(ticket_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            ticket_id,
            user_id,
            created_at: now,
            is_deleted: false,
        }
    }
}

/// A user's available-to-apply ticket balance.
///
/// `used` counts all of the user's active applications regardless of raffle
/// outcome; `returned` counts only applications whose raffle ended `failed`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TicketBalance {
    pub bought: i64,
    pub used: i64,
    pub returned: i64,
}

impl TicketBalance {
    pub fn available(&self) -> i64 {
        self.bought - self.used + self.returned
    }
}

/// Catalog entity a raffle is drawn for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub size: String,
    pub brand: String,
    pub serial: String,
    pub color: String,
    pub release_date: NaiveDate,
    /// The staff user who registered the product.
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl Product {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        size: String,
        brand: String,
        serial: String,
        color: String,
        release_date: NaiveDate,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            size,
            brand,
            serial,
            color,
            release_date,
            user_id,
            created_at: now,
            is_deleted: false,
        }
    }
}

/// The central entity: a time-boxed drawing for a product, gated by a target
/// number of applications.
///
/// `progress` and `announce_date_time` are derived fields — pure functions of
/// the schedule, the target quantity, and the live application count. They
/// are never set directly by callers; see `progress::compute_progress` and
/// `progress::compute_announce_date_time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Raffle {
    pub id: Uuid,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub announce_date_time: DateTime<Utc>,
    pub target_quantity: u32,
    pub progress: Progress,
    /// The staff user who registered the raffle.
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// One user's claim on one slot in a raffle. At most one active row per
/// (raffle, user) pair; `created_at` defines submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleApplication {
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl RaffleApplication {
    pub fn new(raffle_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            raffle_id,
            user_id,
            created_at: now,
            is_deleted: false,
        }
    }
}

/// One of the reduced pool of applicants eligible for final winner selection.
/// Created in bulk exactly once per raffle, when it reaches `done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleCandidate {
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub application_id: Uuid,
    pub user_id: Uuid,
    /// Contiguous block of lottery numbers from 1..=45, disjoint from every
    /// other candidate's block on the same raffle.
    pub given_numbers: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl RaffleCandidate {
    pub fn new(
        raffle_id: Uuid,
        application_id: Uuid,
        user_id: Uuid,
        given_numbers: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            raffle_id,
            application_id,
            user_id,
            given_numbers,
            created_at: now,
        }
    }

    /// Set membership, not substring matching — 7 must not match a block
    /// containing only 17.
    pub fn contains_number(&self, number: u8) -> bool {
        self.given_numbers.contains(&number)
    }
}

/// The final winner of a raffle. At most one per raffle, immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleWinner {
    pub id: Uuid,
    pub raffle_id: Uuid,
    pub candidate_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl RaffleWinner {
    pub fn new(raffle_id: Uuid, candidate_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            raffle_id,
            candidate_id,
            created_at: now,
        }
    }
}

/// External weekly lottery result. Read-only reference data once recorded;
/// `draw_sequence_number` is derived from `draw_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotteryDraw {
    pub id: Uuid,
    pub draw_sequence_number: i64,
    pub draw_date: NaiveDate,
    pub bonus_number: u8,
    pub created_at: DateTime<Utc>,
}
