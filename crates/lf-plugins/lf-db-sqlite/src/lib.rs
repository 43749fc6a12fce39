//! # lf-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational
//! model and the `lf-core` domain models. One `SqliteStore` implements every
//! storage port; the binary hands out the same pool behind each trait object.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use lf_core::progress::announce_date;
use lf_core::{
    DrawRepo, LotteryDraw, Product, ProductRepo, Progress, Raffle, RaffleApplication,
    RaffleCandidate, RaffleRepo, RaffleWinner, Ticket, TicketBalance, TicketPurchase, TicketRepo,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tickets (
    id          BLOB PRIMARY KEY,
    quantity    INTEGER NOT NULL,
    price       INTEGER NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ticket_purchases (
    id          BLOB PRIMARY KEY,
    ticket_id   BLOB NOT NULL REFERENCES tickets(id),
    user_id     BLOB NOT NULL,
    created_at  TEXT NOT NULL,
    is_deleted  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS products (
    id           BLOB PRIMARY KEY,
    name         TEXT NOT NULL,
    size         TEXT NOT NULL,
    brand        TEXT NOT NULL,
    serial       TEXT NOT NULL,
    color        TEXT NOT NULL,
    release_date TEXT NOT NULL,
    user_id      BLOB NOT NULL,
    created_at   TEXT NOT NULL,
    is_deleted   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS raffles (
    id                 BLOB PRIMARY KEY,
    start_date_time    TEXT NOT NULL,
    end_date_time      TEXT NOT NULL,
    announce_date_time TEXT NOT NULL,
    target_quantity    INTEGER NOT NULL,
    progress           TEXT NOT NULL,
    user_id            BLOB NOT NULL,
    product_id         BLOB NOT NULL REFERENCES products(id),
    created_at         TEXT NOT NULL,
    is_deleted         INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS raffle_applications (
    id          BLOB PRIMARY KEY,
    raffle_id   BLOB NOT NULL REFERENCES raffles(id) ON DELETE CASCADE,
    user_id     BLOB NOT NULL,
    created_at  TEXT NOT NULL,
    is_deleted  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS raffle_candidates (
    id             BLOB PRIMARY KEY,
    raffle_id      BLOB NOT NULL REFERENCES raffles(id) ON DELETE CASCADE,
    application_id BLOB NOT NULL REFERENCES raffle_applications(id) ON DELETE CASCADE,
    user_id        BLOB NOT NULL,
    given_numbers  TEXT NOT NULL,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS raffle_winners (
    id           BLOB PRIMARY KEY,
    raffle_id    BLOB NOT NULL UNIQUE REFERENCES raffles(id) ON DELETE CASCADE,
    candidate_id BLOB NOT NULL REFERENCES raffle_candidates(id) ON DELETE CASCADE,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lottery_draws (
    id                   BLOB PRIMARY KEY,
    draw_sequence_number INTEGER NOT NULL,
    draw_date            TEXT NOT NULL UNIQUE,
    bonus_number         INTEGER NOT NULL,
    created_at           TEXT NOT NULL
);
"#;

pub struct SqliteStore {
    pool: SqlitePool,
}

// Helpers for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

fn row_to_raffle(row: &SqliteRow) -> anyhow::Result<Raffle> {
    Ok(Raffle {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        start_date_time: row.get("start_date_time"),
        end_date_time: row.get("end_date_time"),
        announce_date_time: row.get("announce_date_time"),
        target_quantity: row.get::<i64, _>("target_quantity") as u32,
        progress: row
            .get::<String, _>("progress")
            .parse::<Progress>()
            .map_err(|e| anyhow::anyhow!(e))?,
        user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice()),
        product_id: blob_to_uuid(row.get::<Vec<u8>, _>("product_id").as_slice()),
        created_at: row.get("created_at"),
        is_deleted: row.get("is_deleted"),
    })
}

fn row_to_application(row: &SqliteRow) -> RaffleApplication {
    RaffleApplication {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        raffle_id: blob_to_uuid(row.get::<Vec<u8>, _>("raffle_id").as_slice()),
        user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice()),
        created_at: row.get("created_at"),
        is_deleted: row.get("is_deleted"),
    }
}

fn row_to_candidate(row: &SqliteRow) -> RaffleCandidate {
    RaffleCandidate {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        raffle_id: blob_to_uuid(row.get::<Vec<u8>, _>("raffle_id").as_slice()),
        application_id: blob_to_uuid(row.get::<Vec<u8>, _>("application_id").as_slice()),
        user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice()),
        given_numbers: serde_json::from_str(&row.get::<String, _>("given_numbers"))
            .unwrap_or_default(),
        created_at: row.get("created_at"),
    }
}

fn row_to_product(row: &SqliteRow) -> Product {
    Product {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        name: row.get("name"),
        size: row.get("size"),
        brand: row.get("brand"),
        serial: row.get("serial"),
        color: row.get("color"),
        release_date: row.get("release_date"),
        user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice()),
        created_at: row.get("created_at"),
        is_deleted: row.get("is_deleted"),
    }
}

fn row_to_draw(row: &SqliteRow) -> LotteryDraw {
    LotteryDraw {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        draw_sequence_number: row.get("draw_sequence_number"),
        draw_date: row.get("draw_date"),
        bonus_number: row.get::<i64, _>("bonus_number") as u8,
        created_at: row.get("created_at"),
    }
}

impl SqliteStore {
    /// Opens the database and applies the schema.
    ///
    /// In-memory SQLite databases exist per-connection, so the pool is
    /// limited to a single connection for `:memory:` URLs.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        debug!(url, "sqlite store initialized");
        Ok(Self { pool })
    }
}

#[async_trait]
impl RaffleRepo for SqliteStore {
    async fn create_raffle(&self, raffle: Raffle) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO raffles (id, start_date_time, end_date_time, announce_date_time, \
             target_quantity, progress, user_id, product_id, created_at, is_deleted) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(raffle.id))
        .bind(raffle.start_date_time)
        .bind(raffle.end_date_time)
        .bind(raffle.announce_date_time)
        .bind(raffle.target_quantity as i64)
        .bind(raffle.progress.as_str())
        .bind(uuid_to_blob(raffle.user_id))
        .bind(uuid_to_blob(raffle.product_id))
        .bind(raffle.created_at)
        .bind(raffle.is_deleted)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_raffle(&self, id: Uuid) -> anyhow::Result<Option<Raffle>> {
        let row = sqlx::query("SELECT * FROM raffles WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_raffle(&r)).transpose()
    }

    /// Listing order: ongoing raffles by soonest end first, waiting by
    /// soonest start, then finished ones by most recent end.
    async fn list_raffles_ranked(&self) -> anyhow::Result<Vec<Raffle>> {
        let rows = sqlx::query(
            "SELECT * FROM raffles WHERE is_deleted = 0 ORDER BY \
             CASE progress WHEN 'ongoing' THEN 1 WHEN 'waiting' THEN 2 WHEN 'done' THEN 3 ELSE 4 END, \
             CASE progress WHEN 'ongoing' THEN end_date_time WHEN 'waiting' THEN start_date_time END ASC, \
             end_date_time DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_raffle).collect()
    }

    async fn update_raffle_state(
        &self,
        id: Uuid,
        progress: Progress,
        announce_date_time: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE raffles SET progress = ?, announce_date_time = ? WHERE id = ?")
            .bind(progress.as_str())
            .bind(announce_date_time)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn soft_delete_raffle(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE raffles SET is_deleted = 1 WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_done_raffles_announced_on(&self, date: NaiveDate) -> anyhow::Result<Vec<Raffle>> {
        // announce instants are stored in UTC; the KST calendar-date match
        // happens here rather than in SQL
        let rows = sqlx::query("SELECT * FROM raffles WHERE is_deleted = 0 AND progress = 'done'")
            .fetch_all(&self.pool)
            .await?;
        let raffles: anyhow::Result<Vec<Raffle>> = rows.iter().map(row_to_raffle).collect();
        Ok(raffles?
            .into_iter()
            .filter(|r| announce_date(r.announce_date_time) == date)
            .collect())
    }

    async fn create_application(&self, application: RaffleApplication) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO raffle_applications (id, raffle_id, user_id, created_at, is_deleted) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(application.id))
        .bind(uuid_to_blob(application.raffle_id))
        .bind(uuid_to_blob(application.user_id))
        .bind(application.created_at)
        .bind(application.is_deleted)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_active_application(
        &self,
        raffle_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<RaffleApplication>> {
        let row = sqlx::query(
            "SELECT * FROM raffle_applications \
             WHERE raffle_id = ? AND user_id = ? AND is_deleted = 0",
        )
        .bind(uuid_to_blob(raffle_id))
        .bind(uuid_to_blob(user_id))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| row_to_application(&r)))
    }

    async fn find_active_applications(
        &self,
        raffle_id: Uuid,
    ) -> anyhow::Result<Vec<RaffleApplication>> {
        let rows = sqlx::query(
            "SELECT * FROM raffle_applications \
             WHERE raffle_id = ? AND is_deleted = 0 ORDER BY created_at ASC",
        )
        .bind(uuid_to_blob(raffle_id))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_application).collect())
    }

    async fn count_active_applications(&self, raffle_id: Uuid) -> anyhow::Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM raffle_applications WHERE raffle_id = ? AND is_deleted = 0",
        )
        .bind(uuid_to_blob(raffle_id))
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u32)
    }

    /// Atomic bulk insert. A transaction ensures a raffle never ends up with
    /// a partial candidate pool.
    async fn create_candidates(&self, candidates: Vec<RaffleCandidate>) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        for candidate in candidates {
            sqlx::query(
                "INSERT INTO raffle_candidates \
                 (id, raffle_id, application_id, user_id, given_numbers, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(uuid_to_blob(candidate.id))
            .bind(uuid_to_blob(candidate.raffle_id))
            .bind(uuid_to_blob(candidate.application_id))
            .bind(uuid_to_blob(candidate.user_id))
            .bind(serde_json::to_string(&candidate.given_numbers)?)
            .bind(candidate.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_candidates(&self, raffle_id: Uuid) -> anyhow::Result<Vec<RaffleCandidate>> {
        let rows = sqlx::query(
            "SELECT * FROM raffle_candidates WHERE raffle_id = ? ORDER BY created_at ASC",
        )
        .bind(uuid_to_blob(raffle_id))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_candidate).collect())
    }

    async fn count_candidates(&self, raffle_id: Uuid) -> anyhow::Result<u32> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM raffle_candidates WHERE raffle_id = ?")
                .bind(uuid_to_blob(raffle_id))
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u32)
    }

    async fn create_winner(&self, winner: RaffleWinner) -> anyhow::Result<()> {
        // raffle_id is UNIQUE; a second winner insert fails at the schema too
        sqlx::query(
            "INSERT INTO raffle_winners (id, raffle_id, candidate_id, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(winner.id))
        .bind(uuid_to_blob(winner.raffle_id))
        .bind(uuid_to_blob(winner.candidate_id))
        .bind(winner.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_winner(&self, raffle_id: Uuid) -> anyhow::Result<Option<RaffleWinner>> {
        let row = sqlx::query("SELECT * FROM raffle_winners WHERE raffle_id = ?")
            .bind(uuid_to_blob(raffle_id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| RaffleWinner {
            id: blob_to_uuid(r.get::<Vec<u8>, _>("id").as_slice()),
            raffle_id: blob_to_uuid(r.get::<Vec<u8>, _>("raffle_id").as_slice()),
            candidate_id: blob_to_uuid(r.get::<Vec<u8>, _>("candidate_id").as_slice()),
            created_at: r.get("created_at"),
        }))
    }
}

#[async_trait]
impl TicketRepo for SqliteStore {
    async fn create_ticket(&self, ticket: Ticket) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO tickets (id, quantity, price, created_at) VALUES (?, ?, ?, ?)")
            .bind(uuid_to_blob(ticket.id))
            .bind(ticket.quantity as i64)
            .bind(ticket.price)
            .bind(ticket.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_ticket(&self, id: Uuid) -> anyhow::Result<Option<Ticket>> {
        let row = sqlx::query("SELECT * FROM tickets WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| Ticket {
            id: blob_to_uuid(r.get::<Vec<u8>, _>("id").as_slice()),
            quantity: r.get::<i64, _>("quantity") as u32,
            price: r.get("price"),
            created_at: r.get("created_at"),
        }))
    }

    async fn list_tickets(&self) -> anyhow::Result<Vec<Ticket>> {
        let rows = sqlx::query("SELECT * FROM tickets ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| Ticket {
                id: blob_to_uuid(r.get::<Vec<u8>, _>("id").as_slice()),
                quantity: r.get::<i64, _>("quantity") as u32,
                price: r.get("price"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    async fn create_purchase(&self, purchase: TicketPurchase) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO ticket_purchases (id, ticket_id, user_id, created_at, is_deleted) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(purchase.id))
        .bind(uuid_to_blob(purchase.ticket_id))
        .bind(uuid_to_blob(purchase.user_id))
        .bind(purchase.created_at)
        .bind(purchase.is_deleted)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// bought − used + returned in a single round trip so the components
    /// can never be read across different snapshots.
    async fn ticket_balance(&self, user_id: Uuid) -> anyhow::Result<TicketBalance> {
        let user = uuid_to_blob(user_id);
        let row = sqlx::query(
            "SELECT \
             COALESCE((SELECT SUM(t.quantity) FROM ticket_purchases p \
                       JOIN tickets t ON t.id = p.ticket_id \
                       WHERE p.user_id = ? AND p.is_deleted = 0), 0) AS bought, \
             (SELECT COUNT(*) FROM raffle_applications a \
              WHERE a.user_id = ? AND a.is_deleted = 0) AS used, \
             (SELECT COUNT(*) FROM raffle_applications a \
              JOIN raffles r ON r.id = a.raffle_id \
              WHERE a.user_id = ? AND a.is_deleted = 0 AND r.progress = 'failed') AS returned",
        )
        .bind(user.clone())
        .bind(user.clone())
        .bind(user)
        .fetch_one(&self.pool)
        .await?;
        Ok(TicketBalance {
            bought: row.get("bought"),
            used: row.get("used"),
            returned: row.get("returned"),
        })
    }
}

#[async_trait]
impl ProductRepo for SqliteStore {
    async fn create_product(&self, product: Product) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO products \
             (id, name, size, brand, serial, color, release_date, user_id, created_at, is_deleted) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(product.id))
        .bind(product.name)
        .bind(product.size)
        .bind(product.brand)
        .bind(product.serial)
        .bind(product.color)
        .bind(product.release_date)
        .bind(uuid_to_blob(product.user_id))
        .bind(product.created_at)
        .bind(product.is_deleted)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_product(&r)))
    }

    async fn list_active_products(&self) -> anyhow::Result<Vec<Product>> {
        let rows =
            sqlx::query("SELECT * FROM products WHERE is_deleted = 0 ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(row_to_product).collect())
    }

    async fn soft_delete_product(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE products SET is_deleted = 1 WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DrawRepo for SqliteStore {
    async fn create_draw(&self, draw: LotteryDraw) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO lottery_draws \
             (id, draw_sequence_number, draw_date, bonus_number, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(draw.id))
        .bind(draw.draw_sequence_number)
        .bind(draw.draw_date)
        .bind(draw.bonus_number as i64)
        .bind(draw.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_draw_by_date(&self, draw_date: NaiveDate) -> anyhow::Result<Option<LotteryDraw>> {
        let row = sqlx::query("SELECT * FROM lottery_draws WHERE draw_date = ?")
            .bind(draw_date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| row_to_draw(&r)))
    }

    async fn list_draws(&self) -> anyhow::Result<Vec<LotteryDraw>> {
        let rows = sqlx::query("SELECT * FROM lottery_draws ORDER BY draw_date ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_draw).collect())
    }
}
