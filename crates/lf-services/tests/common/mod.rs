//! Shared in-memory store for service-level scenario tests. Implements every
//! storage port over plain mutex-guarded collections so lifecycle tests run
//! without a database.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use lf_core::progress::{announce_date, KST};
use lf_core::{
    DrawRepo, LotteryDraw, Product, ProductRepo, Progress, Raffle, RaffleApplication,
    RaffleCandidate, RaffleRepo, RaffleWinner, Ticket, TicketBalance, TicketPurchase, TicketRepo,
};
use lf_services::{RaffleService, TicketService};

#[derive(Default)]
pub struct MemStore {
    pub raffles: Mutex<HashMap<Uuid, Raffle>>,
    pub applications: Mutex<Vec<RaffleApplication>>,
    pub candidates: Mutex<Vec<RaffleCandidate>>,
    pub winners: Mutex<Vec<RaffleWinner>>,
    pub tickets: Mutex<HashMap<Uuid, Ticket>>,
    pub purchases: Mutex<Vec<TicketPurchase>>,
    pub products: Mutex<HashMap<Uuid, Product>>,
    pub draws: Mutex<Vec<LotteryDraw>>,
}

#[async_trait]
impl RaffleRepo for MemStore {
    async fn create_raffle(&self, raffle: Raffle) -> anyhow::Result<()> {
        self.raffles.lock().unwrap().insert(raffle.id, raffle);
        Ok(())
    }

    async fn get_raffle(&self, id: Uuid) -> anyhow::Result<Option<Raffle>> {
        Ok(self.raffles.lock().unwrap().get(&id).cloned())
    }

    async fn list_raffles_ranked(&self) -> anyhow::Result<Vec<Raffle>> {
        let mut raffles: Vec<Raffle> = self
            .raffles
            .lock()
            .unwrap()
            .values()
            .filter(|r| !r.is_deleted)
            .cloned()
            .collect();
        raffles.sort_by(|a, b| {
            a.progress.rank().cmp(&b.progress.rank()).then_with(|| {
                match a.progress {
                    Progress::Ongoing => a.end_date_time.cmp(&b.end_date_time),
                    Progress::Waiting => a.start_date_time.cmp(&b.start_date_time),
                    _ => b.end_date_time.cmp(&a.end_date_time),
                }
            })
        });
        Ok(raffles)
    }

    async fn update_raffle_state(
        &self,
        id: Uuid,
        progress: Progress,
        announce_date_time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if let Some(raffle) = self.raffles.lock().unwrap().get_mut(&id) {
            raffle.progress = progress;
            raffle.announce_date_time = announce_date_time;
        }
        Ok(())
    }

    async fn soft_delete_raffle(&self, id: Uuid) -> anyhow::Result<()> {
        if let Some(raffle) = self.raffles.lock().unwrap().get_mut(&id) {
            raffle.is_deleted = true;
        }
        Ok(())
    }

    async fn find_done_raffles_announced_on(&self, date: NaiveDate) -> anyhow::Result<Vec<Raffle>> {
        Ok(self
            .raffles
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                !r.is_deleted
                    && r.progress == Progress::Done
                    && announce_date(r.announce_date_time) == date
            })
            .cloned()
            .collect())
    }

    async fn create_application(&self, application: RaffleApplication) -> anyhow::Result<()> {
        self.applications.lock().unwrap().push(application);
        Ok(())
    }

    async fn find_active_application(
        &self,
        raffle_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<RaffleApplication>> {
        Ok(self
            .applications
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.raffle_id == raffle_id && a.user_id == user_id && !a.is_deleted)
            .cloned())
    }

    async fn find_active_applications(
        &self,
        raffle_id: Uuid,
    ) -> anyhow::Result<Vec<RaffleApplication>> {
        let mut apps: Vec<RaffleApplication> = self
            .applications
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.raffle_id == raffle_id && !a.is_deleted)
            .cloned()
            .collect();
        apps.sort_by_key(|a| a.created_at);
        Ok(apps)
    }

    async fn count_active_applications(&self, raffle_id: Uuid) -> anyhow::Result<u32> {
        Ok(self
            .applications
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.raffle_id == raffle_id && !a.is_deleted)
            .count() as u32)
    }

    async fn create_candidates(&self, candidates: Vec<RaffleCandidate>) -> anyhow::Result<()> {
        self.candidates.lock().unwrap().extend(candidates);
        Ok(())
    }

    async fn find_candidates(&self, raffle_id: Uuid) -> anyhow::Result<Vec<RaffleCandidate>> {
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.raffle_id == raffle_id)
            .cloned()
            .collect())
    }

    async fn count_candidates(&self, raffle_id: Uuid) -> anyhow::Result<u32> {
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.raffle_id == raffle_id)
            .count() as u32)
    }

    async fn create_winner(&self, winner: RaffleWinner) -> anyhow::Result<()> {
        self.winners.lock().unwrap().push(winner);
        Ok(())
    }

    async fn find_winner(&self, raffle_id: Uuid) -> anyhow::Result<Option<RaffleWinner>> {
        Ok(self
            .winners
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.raffle_id == raffle_id)
            .cloned())
    }
}

#[async_trait]
impl TicketRepo for MemStore {
    async fn create_ticket(&self, ticket: Ticket) -> anyhow::Result<()> {
        self.tickets.lock().unwrap().insert(ticket.id, ticket);
        Ok(())
    }

    async fn get_ticket(&self, id: Uuid) -> anyhow::Result<Option<Ticket>> {
        Ok(self.tickets.lock().unwrap().get(&id).cloned())
    }

    async fn list_tickets(&self) -> anyhow::Result<Vec<Ticket>> {
        Ok(self.tickets.lock().unwrap().values().cloned().collect())
    }

    async fn create_purchase(&self, purchase: TicketPurchase) -> anyhow::Result<()> {
        self.purchases.lock().unwrap().push(purchase);
        Ok(())
    }

    async fn ticket_balance(&self, user_id: Uuid) -> anyhow::Result<TicketBalance> {
        let tickets = self.tickets.lock().unwrap();
        let bought: i64 = self
            .purchases
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id && !p.is_deleted)
            .filter_map(|p| tickets.get(&p.ticket_id))
            .map(|t| t.quantity as i64)
            .sum();

        let raffles = self.raffles.lock().unwrap();
        let applications = self.applications.lock().unwrap();
        let used = applications
            .iter()
            .filter(|a| a.user_id == user_id && !a.is_deleted)
            .count() as i64;
        let returned = applications
            .iter()
            .filter(|a| {
                a.user_id == user_id
                    && !a.is_deleted
                    && raffles
                        .get(&a.raffle_id)
                        .map(|r| r.progress == Progress::Failed)
                        .unwrap_or(false)
            })
            .count() as i64;

        Ok(TicketBalance {
            bought,
            used,
            returned,
        })
    }
}

#[async_trait]
impl ProductRepo for MemStore {
    async fn create_product(&self, product: Product) -> anyhow::Result<()> {
        self.products.lock().unwrap().insert(product.id, product);
        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }

    async fn list_active_products(&self) -> anyhow::Result<Vec<Product>> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .values()
            .filter(|p| !p.is_deleted)
            .cloned()
            .collect())
    }

    async fn soft_delete_product(&self, id: Uuid) -> anyhow::Result<()> {
        if let Some(product) = self.products.lock().unwrap().get_mut(&id) {
            product.is_deleted = true;
        }
        Ok(())
    }
}

#[async_trait]
impl DrawRepo for MemStore {
    async fn create_draw(&self, draw: LotteryDraw) -> anyhow::Result<()> {
        self.draws.lock().unwrap().push(draw);
        Ok(())
    }

    async fn find_draw_by_date(&self, draw_date: NaiveDate) -> anyhow::Result<Option<LotteryDraw>> {
        Ok(self
            .draws
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.draw_date == draw_date)
            .cloned())
    }

    async fn list_draws(&self) -> anyhow::Result<Vec<LotteryDraw>> {
        Ok(self.draws.lock().unwrap().clone())
    }
}

pub fn services(store: Arc<MemStore>) -> (RaffleService, TicketService) {
    let raffles = RaffleService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        None,
    );
    let tickets = TicketService::new(store);
    (raffles, tickets)
}

pub fn kst(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    KST.with_ymd_and_hms(y, mo, d, h, mi, 0)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

pub async fn seed_product(store: &MemStore, user_id: Uuid) -> Uuid {
    let product = Product::new(
        "Dunk Low".into(),
        "270".into(),
        "Nike".into(),
        "DD1391-100".into(),
        "white/black".into(),
        NaiveDate::from_ymd_opt(2021, 1, 14).unwrap(),
        user_id,
        Utc::now(),
    );
    let id = product.id;
    store.create_product(product).await.unwrap();
    id
}

/// Gives `user_id` a purchase entitling `quantity` applications.
pub async fn give_tickets(store: &MemStore, user_id: Uuid, quantity: u32) {
    let ticket = Ticket::new(quantity, 1_000, Utc::now());
    let ticket_id = ticket.id;
    store.create_ticket(ticket).await.unwrap();
    store
        .create_purchase(TicketPurchase::new(ticket_id, user_id, Utc::now()))
        .await
        .unwrap();
}
