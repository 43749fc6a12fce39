//! # RaffleService
//!
//! The single orchestrator for every state-affecting raffle operation:
//! admission, progress refresh, candidate sampling, and winner resolution.
//! Each cascade step is an explicit method call here rather than a save-time
//! side effect, so the whole chain is visible and testable in isolation.
//!
//! Per-raffle serialization: admission, the done-transition, sampling, and
//! resolution for one raffle all run under that raffle's async mutex, taken
//! from a `DashMap` registry keyed by raffle id. Operations on different
//! raffles proceed in parallel.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use lf_core::progress::{
    announce_date, compute_announce_date_time, compute_progress, draw_sequence_number, is_saturday,
    KST,
};
use lf_core::sampler::{candidate_pool_size, number_blocks};
use lf_core::{
    AppError, DrawFeed, DrawRepo, LotteryDraw, Product, ProductRepo, Progress, Raffle,
    RaffleApplication, RaffleCandidate, RaffleRepo, RaffleWinner, Result,
};

/// Caller-supplied fields for raffle creation; the derived fields
/// (`progress`, `announce_date_time`) are computed here, never accepted.
#[derive(Debug, Clone)]
pub struct NewRaffle {
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub target_quantity: u32,
    pub user_id: Uuid,
    pub product_id: Uuid,
}

pub struct RaffleService {
    raffles: Arc<dyn RaffleRepo>,
    tickets: Arc<dyn lf_core::TicketRepo>,
    products: Arc<dyn ProductRepo>,
    draws: Arc<dyn DrawRepo>,
    /// Optional live feed; draw ingestion falls back to it when no explicit
    /// bonus number is supplied.
    feed: Option<Arc<dyn DrawFeed>>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl RaffleService {
    pub fn new(
        raffles: Arc<dyn RaffleRepo>,
        tickets: Arc<dyn lf_core::TicketRepo>,
        products: Arc<dyn ProductRepo>,
        draws: Arc<dyn DrawRepo>,
        feed: Option<Arc<dyn DrawFeed>>,
    ) -> Self {
        Self {
            raffles,
            tickets,
            products,
            draws,
            feed,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, raffle_id: Uuid) -> Arc<Mutex<()>> {
        self.locks.entry(raffle_id).or_default().value().clone()
    }

    async fn get_raffle_or_not_found(&self, raffle_id: Uuid) -> Result<Raffle> {
        self.raffles
            .get_raffle(raffle_id)
            .await?
            .filter(|r| !r.is_deleted)
            .ok_or_else(|| AppError::NotFound("Raffle".into(), raffle_id.to_string()))
    }

    pub async fn create_raffle(&self, input: NewRaffle, now: DateTime<Utc>) -> Result<Raffle> {
        if input.target_quantity < 3 {
            return Err(AppError::Validation(
                "target quantity must be at least 3".into(),
            ));
        }
        if input.end_date_time <= input.start_date_time {
            return Err(AppError::Validation(
                "end date must be after start date".into(),
            ));
        }
        self.products
            .get_product(input.product_id)
            .await?
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| AppError::NotFound("Product".into(), input.product_id.to_string()))?;

        let raffle = Raffle {
            id: Uuid::now_v7(),
            start_date_time: input.start_date_time,
            end_date_time: input.end_date_time,
            announce_date_time: compute_announce_date_time(input.end_date_time),
            target_quantity: input.target_quantity,
            progress: compute_progress(
                now,
                input.start_date_time,
                input.end_date_time,
                input.target_quantity,
                0,
            ),
            user_id: input.user_id,
            product_id: input.product_id,
            created_at: now,
            is_deleted: false,
        };
        self.raffles.create_raffle(raffle.clone()).await?;
        info!(raffle_id = %raffle.id, progress = %raffle.progress, "raffle created");
        Ok(raffle)
    }

    pub async fn get_raffle(&self, raffle_id: Uuid) -> Result<Raffle> {
        self.get_raffle_or_not_found(raffle_id).await
    }

    pub async fn list_raffles(&self) -> Result<Vec<Raffle>> {
        Ok(self.raffles.list_raffles_ranked().await?)
    }

    pub async fn delete_raffle(&self, raffle_id: Uuid) -> Result<()> {
        self.get_raffle_or_not_found(raffle_id).await?;
        Ok(self.raffles.soft_delete_raffle(raffle_id).await?)
    }

    pub async fn applicants(&self, raffle_id: Uuid) -> Result<Vec<RaffleApplication>> {
        self.get_raffle_or_not_found(raffle_id).await?;
        Ok(self.raffles.find_active_applications(raffle_id).await?)
    }

    pub async fn candidates(&self, raffle_id: Uuid) -> Result<Vec<RaffleCandidate>> {
        self.get_raffle_or_not_found(raffle_id).await?;
        Ok(self.raffles.find_candidates(raffle_id).await?)
    }

    pub async fn winner(&self, raffle_id: Uuid) -> Result<Option<RaffleWinner>> {
        self.get_raffle_or_not_found(raffle_id).await?;
        Ok(self.raffles.find_winner(raffle_id).await?)
    }

    /// Admits one application, validating in order and failing fast:
    /// duplicate, ticket balance, raffle state, capacity. On the application
    /// that fills the raffle, eagerly transitions it to `done`, stamps the
    /// announce date from `now`, and samples candidates synchronously.
    ///
    /// Returns the 1-indexed submission ordinal.
    pub async fn apply(&self, raffle_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<u32> {
        let lock = self.lock_for(raffle_id);
        let _guard = lock.lock().await;

        let raffle = self.get_raffle_or_not_found(raffle_id).await?;

        // 1. Duplicate check
        if self
            .raffles
            .find_active_application(raffle_id, user_id)
            .await?
            .is_some()
        {
            debug!(%raffle_id, %user_id, "rejected: already applied");
            return Err(AppError::AlreadyApplied);
        }

        // 2. Ticket balance
        let balance = self.tickets.ticket_balance(user_id).await?;
        if balance.available() <= 0 {
            debug!(%raffle_id, %user_id, "rejected: no tickets");
            return Err(AppError::NoTicketsOwned);
        }

        let applied = self.raffles.count_active_applications(raffle_id).await?;

        // 3. Raffle state. Time-gated classification only; the count gate is
        // the capacity check below, so a stale `ongoing` raffle that somehow
        // filled up reports RaffleFull rather than a state error.
        let state = if raffle.progress.is_terminal() {
            raffle.progress
        } else if now < raffle.start_date_time {
            Progress::Waiting
        } else if now <= raffle.end_date_time {
            Progress::Ongoing
        } else {
            Progress::Failed
        };
        if state != Progress::Ongoing {
            debug!(%raffle_id, %user_id, %state, "rejected: raffle not ongoing");
            return Err(AppError::InvalidRaffleState(state));
        }

        // 4. Capacity
        if applied >= raffle.target_quantity {
            debug!(%raffle_id, %user_id, "rejected: raffle full");
            return Err(AppError::RaffleFull(raffle.target_quantity));
        }

        let application = RaffleApplication::new(raffle_id, user_id, now);
        self.raffles.create_application(application).await?;
        let ordinal = applied + 1;

        if ordinal == raffle.target_quantity {
            // The N-th application is the authoritative done-transition.
            let announce = compute_announce_date_time(now);
            self.raffles
                .update_raffle_state(raffle_id, Progress::Done, announce)
                .await?;
            info!(%raffle_id, %announce, "raffle filled, transitioned to done");

            let mut done_raffle = raffle;
            done_raffle.progress = Progress::Done;
            done_raffle.announce_date_time = announce;
            self.sample_candidates_inner(&done_raffle, now).await?;
        }

        Ok(ordinal)
    }

    /// Consistency-fallback recompute of `progress`. Terminal states never
    /// change; a transition to `done` through this path stamps the announce
    /// date from `now` and samples candidates, exactly as admission does.
    pub async fn refresh_progress(
        &self,
        raffle_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Progress, Progress)> {
        let lock = self.lock_for(raffle_id);
        let _guard = lock.lock().await;

        let raffle = self.get_raffle_or_not_found(raffle_id).await?;
        let before = raffle.progress;
        if before.is_terminal() {
            return Ok((before, before));
        }

        let applied = self.raffles.count_active_applications(raffle_id).await?;
        let after = compute_progress(
            now,
            raffle.start_date_time,
            raffle.end_date_time,
            raffle.target_quantity,
            applied,
        );
        if after != before {
            let announce = if after == Progress::Done {
                compute_announce_date_time(now)
            } else {
                raffle.announce_date_time
            };
            self.raffles
                .update_raffle_state(raffle_id, after, announce)
                .await?;
            info!(%raffle_id, %before, %after, "raffle progress refreshed");

            if after == Progress::Done {
                let mut done_raffle = raffle;
                done_raffle.progress = Progress::Done;
                done_raffle.announce_date_time = announce;
                self.sample_candidates_inner(&done_raffle, now).await?;
            }
        }
        Ok((before, after))
    }

    /// Runs the first-stage drawing for a raffle. Returns false without
    /// effect when the raffle is not `done` or has already been sampled.
    pub async fn sample_candidates(&self, raffle_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let lock = self.lock_for(raffle_id);
        let _guard = lock.lock().await;

        let raffle = self.get_raffle_or_not_found(raffle_id).await?;
        self.sample_candidates_inner(&raffle, now).await
    }

    /// Caller must hold the raffle's lock.
    async fn sample_candidates_inner(&self, raffle: &Raffle, now: DateTime<Utc>) -> Result<bool> {
        if raffle.progress != Progress::Done {
            return Ok(false);
        }
        if self.raffles.count_candidates(raffle.id).await? > 0 {
            debug!(raffle_id = %raffle.id, "sampling skipped: candidates already drawn");
            return Ok(false);
        }

        let applications = self.raffles.find_active_applications(raffle.id).await?;
        let pool_size = candidate_pool_size(raffle.target_quantity) as usize;
        if applications.len() < pool_size {
            return Err(AppError::SamplingInvariant(
                raffle.id,
                format!(
                    "{} applications for a candidate pool of {pool_size}",
                    applications.len()
                ),
            ));
        }

        // rand's ThreadRng is not Send; keep it out of await scope.
        let candidates: Vec<RaffleCandidate> = {
            let mut rng = rand::thread_rng();
            let sampled: Vec<&RaffleApplication> = applications
                .choose_multiple(&mut rng, pool_size)
                .collect();
            sampled
                .into_iter()
                .zip(number_blocks(pool_size as u32))
                .map(|(app, numbers)| {
                    RaffleCandidate::new(raffle.id, app.id, app.user_id, numbers, now)
                })
                .collect()
        };

        self.raffles.create_candidates(candidates).await?;
        info!(raffle_id = %raffle.id, pool_size, "candidates sampled");
        Ok(true)
    }

    /// Records a weekly draw result and resolves winners for every `done`
    /// raffle whose announce date matches. Re-submitting an already-recorded
    /// draw re-runs resolution, which skips per-raffle where a winner exists.
    ///
    /// Returns the recorded draw and the number of winners created.
    pub async fn record_draw(
        &self,
        draw_date: NaiveDate,
        bonus_number: Option<u8>,
        now: DateTime<Utc>,
    ) -> Result<(LotteryDraw, u32)> {
        if !is_saturday(draw_date) {
            return Err(AppError::DrawDateInvalid(
                "draw date must be a Saturday".into(),
            ));
        }
        if draw_date > now.with_timezone(&*KST).date_naive() {
            return Err(AppError::DrawDateInvalid(
                "the draw has not taken place yet".into(),
            ));
        }

        let draw = match self.draws.find_draw_by_date(draw_date).await? {
            Some(existing) => {
                debug!(%draw_date, "draw already recorded, re-running resolution");
                existing
            }
            None => {
                let sequence = draw_sequence_number(draw_date);
                let bonus = match bonus_number {
                    Some(n) => n,
                    None => self
                        .fetch_bonus_from_feed(sequence)
                        .await?
                        .ok_or_else(|| {
                            AppError::DrawDateInvalid(format!(
                                "no published result for draw {sequence}"
                            ))
                        })?,
                };
                if !(1..=45).contains(&bonus) {
                    return Err(AppError::Validation(format!(
                        "bonus number {bonus} outside 1..=45"
                    )));
                }
                let draw = LotteryDraw {
                    id: Uuid::now_v7(),
                    draw_sequence_number: sequence,
                    draw_date,
                    bonus_number: bonus,
                    created_at: now,
                };
                self.draws.create_draw(draw.clone()).await?;
                info!(%draw_date, sequence, bonus, "lottery draw recorded");
                draw
            }
        };

        let winners = self.resolve_winners(&draw, now).await?;
        Ok((draw, winners))
    }

    pub async fn list_draws(&self) -> Result<Vec<LotteryDraw>> {
        Ok(self.draws.list_draws().await?)
    }

    /// Resolves winners for all `done` raffles announced on the draw date.
    /// A raffle whose candidate blocks violate the exactly-one-match
    /// invariant is reported and skipped; the rest still resolve.
    pub async fn resolve_winners(&self, draw: &LotteryDraw, now: DateTime<Utc>) -> Result<u32> {
        let raffles = self
            .raffles
            .find_done_raffles_announced_on(draw.draw_date)
            .await?;
        let mut created = 0;
        for raffle in raffles {
            match self.resolve_raffle(&raffle, draw, now).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(err) => {
                    error!(raffle_id = %raffle.id, %err, "winner resolution failed");
                }
            }
        }
        Ok(created)
    }

    /// Standalone single-raffle resolution: requires the announce instant to
    /// have passed, the raffle to be `done`, and a recorded draw for its
    /// announce date. Returns false if a winner already exists.
    pub async fn resolve_one(&self, raffle_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let raffle = self.get_raffle_or_not_found(raffle_id).await?;
        if now <= raffle.announce_date_time {
            return Err(AppError::AnnouncePending(raffle.announce_date_time));
        }
        if raffle.progress != Progress::Done {
            return Err(AppError::InvalidRaffleState(raffle.progress));
        }

        let date = announce_date(raffle.announce_date_time);
        let draw = self
            .draws
            .find_draw_by_date(date)
            .await?
            .ok_or(AppError::DrawNotRecorded(date))?;

        self.resolve_raffle(&raffle, &draw, now).await
    }

    async fn resolve_raffle(
        &self,
        raffle: &Raffle,
        draw: &LotteryDraw,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let lock = self.lock_for(raffle.id);
        let _guard = lock.lock().await;

        if self.raffles.find_winner(raffle.id).await?.is_some() {
            debug!(raffle_id = %raffle.id, "winner already resolved");
            return Ok(false);
        }

        let candidates = self.raffles.find_candidates(raffle.id).await?;
        let matching: Vec<&RaffleCandidate> = candidates
            .iter()
            .filter(|c| c.contains_number(draw.bonus_number))
            .collect();
        let candidate = match matching.as_slice() {
            [one] => *one,
            [] => {
                return Err(AppError::SamplingInvariant(
                    raffle.id,
                    format!("no candidate block contains bonus number {}", draw.bonus_number),
                ))
            }
            many => {
                return Err(AppError::SamplingInvariant(
                    raffle.id,
                    format!(
                        "{} candidate blocks contain bonus number {}",
                        many.len(),
                        draw.bonus_number
                    ),
                ))
            }
        };

        self.raffles
            .create_winner(RaffleWinner::new(raffle.id, candidate.id, now))
            .await?;
        info!(raffle_id = %raffle.id, candidate_id = %candidate.id, "winner resolved");
        Ok(true)
    }

    // Product catalog passthroughs. Staffness checks live with the excluded
    // auth collaborator; callers identify themselves explicitly.
    pub async fn create_product(&self, product: Product) -> Result<Product> {
        self.products.create_product(product.clone()).await?;
        Ok(product)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.list_active_products().await?)
    }

    pub async fn delete_product(&self, product_id: Uuid) -> Result<()> {
        self.products
            .get_product(product_id)
            .await?
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| AppError::NotFound("Product".into(), product_id.to_string()))?;
        Ok(self.products.soft_delete_product(product_id).await?)
    }

    async fn fetch_bonus_from_feed(&self, sequence: i64) -> Result<Option<u8>> {
        match &self.feed {
            Some(feed) => Ok(feed.fetch_bonus_number(sequence).await?),
            None => Ok(None),
        }
    }
}
