//! # Core Traits (Ports)
//!
//! Any storage or feed plugin must implement these traits to be used by the
//! binary. Repositories expose explicit `find_active_*` methods instead of a
//! soft-delete-aware query layer; services never see deleted rows unless they
//! ask for them.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    LotteryDraw, Product, Progress, Raffle, RaffleApplication, RaffleCandidate, RaffleWinner,
    Ticket, TicketBalance, TicketPurchase,
};

/// Persistence contract for raffles and their applications, candidates, and
/// winners. One raffle strictly owns its child rows.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RaffleRepo: Send + Sync {
    // Raffle operations
    async fn create_raffle(&self, raffle: Raffle) -> anyhow::Result<()>;
    async fn get_raffle(&self, id: Uuid) -> anyhow::Result<Option<Raffle>>;
    /// Active raffles ranked for listing: ongoing (end asc), waiting
    /// (start asc), then done/failed (end desc).
    async fn list_raffles_ranked(&self) -> anyhow::Result<Vec<Raffle>>;
    /// Persists the two derived fields in one write.
    async fn update_raffle_state(
        &self,
        id: Uuid,
        progress: Progress,
        announce_date_time: DateTime<Utc>,
    ) -> anyhow::Result<()>;
    async fn soft_delete_raffle(&self, id: Uuid) -> anyhow::Result<()>;
    async fn find_done_raffles_announced_on(&self, date: NaiveDate) -> anyhow::Result<Vec<Raffle>>;

    // Application operations
    async fn create_application(&self, application: RaffleApplication) -> anyhow::Result<()>;
    async fn find_active_application(
        &self,
        raffle_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<RaffleApplication>>;
    /// Active applications on a raffle, ordered by `created_at`.
    async fn find_active_applications(
        &self,
        raffle_id: Uuid,
    ) -> anyhow::Result<Vec<RaffleApplication>>;
    async fn count_active_applications(&self, raffle_id: Uuid) -> anyhow::Result<u32>;

    // Candidate operations
    async fn create_candidates(&self, candidates: Vec<RaffleCandidate>) -> anyhow::Result<()>;
    async fn find_candidates(&self, raffle_id: Uuid) -> anyhow::Result<Vec<RaffleCandidate>>;
    async fn count_candidates(&self, raffle_id: Uuid) -> anyhow::Result<u32>;

    // Winner operations
    async fn create_winner(&self, winner: RaffleWinner) -> anyhow::Result<()>;
    async fn find_winner(&self, raffle_id: Uuid) -> anyhow::Result<Option<RaffleWinner>>;
}

/// Persistence contract for the ticket catalog and the purchase ledger.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TicketRepo: Send + Sync {
    async fn create_ticket(&self, ticket: Ticket) -> anyhow::Result<()>;
    async fn get_ticket(&self, id: Uuid) -> anyhow::Result<Option<Ticket>>;
    async fn list_tickets(&self) -> anyhow::Result<Vec<Ticket>>;
    async fn create_purchase(&self, purchase: TicketPurchase) -> anyhow::Result<()>;
    /// The 3-way balance: bought − used + returned, computed in one pass so
    /// the components can never drift apart.
    async fn ticket_balance(&self, user_id: Uuid) -> anyhow::Result<TicketBalance>;
}

/// Persistence contract for the product catalog.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProductRepo: Send + Sync {
    async fn create_product(&self, product: Product) -> anyhow::Result<()>;
    async fn get_product(&self, id: Uuid) -> anyhow::Result<Option<Product>>;
    async fn list_active_products(&self) -> anyhow::Result<Vec<Product>>;
    async fn soft_delete_product(&self, id: Uuid) -> anyhow::Result<()>;
}

/// Persistence contract for recorded weekly lottery draws.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DrawRepo: Send + Sync {
    async fn create_draw(&self, draw: LotteryDraw) -> anyhow::Result<()>;
    async fn find_draw_by_date(&self, draw_date: NaiveDate) -> anyhow::Result<Option<LotteryDraw>>;
    async fn list_draws(&self) -> anyhow::Result<Vec<LotteryDraw>>;
}

/// The public weekly lottery-draw data feed.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DrawFeed: Send + Sync {
    /// Fetches the bonus number for a draw by sequence number. `None` means
    /// the draw has not been published yet.
    async fn fetch_bonus_number(&self, draw_sequence_number: i64) -> anyhow::Result<Option<u8>>;
}
