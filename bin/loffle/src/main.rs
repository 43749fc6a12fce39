//! # Loffle Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use serde::Deserialize;

use lf_api::handlers::AppState;
use lf_api::{configure_routes, middleware};
use lf_core::{DrawFeed, DrawRepo, ProductRepo, RaffleRepo, TicketRepo};
use lf_services::{RaffleService, TicketService};

// Feature-gated imports: this is the "compiled-to-order" assembly
#[cfg(feature = "db-sqlite")]
use lf_db_sqlite::SqliteStore;

#[cfg(feature = "lotto-feed")]
use lf_lotto_feed::HttpDrawFeed;

#[derive(Debug, Deserialize)]
struct Settings {
    bind_addr: String,
    database_url: String,
    lotto_feed_enabled: bool,
}

impl Settings {
    /// Reads `LOFFLE_*` environment variables over built-in defaults.
    fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("bind_addr", "127.0.0.1:8080")?
            .set_default("database_url", "sqlite:loffle.db?mode=rwc")?
            .set_default("lotto_feed_enabled", true)?
            .add_source(config::Environment::with_prefix("LOFFLE"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load()?;

    // 1. Initialize the database implementation
    #[cfg(feature = "db-sqlite")]
    let store = Arc::new(SqliteStore::new(&settings.database_url).await?);

    // One store serves every storage port
    let raffles: Arc<dyn RaffleRepo> = store.clone();
    let tickets: Arc<dyn TicketRepo> = store.clone();
    let products: Arc<dyn ProductRepo> = store.clone();
    let draws: Arc<dyn DrawRepo> = store;

    // 2. Initialize the lottery feed, if enabled
    #[cfg(feature = "lotto-feed")]
    let feed: Option<Arc<dyn DrawFeed>> = settings
        .lotto_feed_enabled
        .then(|| Arc::new(HttpDrawFeed::new()) as Arc<dyn DrawFeed>);
    #[cfg(not(feature = "lotto-feed"))]
    let feed: Option<Arc<dyn DrawFeed>> = None;

    // 3. Wrap in AppState (dynamic dispatch behind the service layer)
    let state = web::Data::new(AppState {
        raffles: Arc::new(RaffleService::new(raffles, tickets.clone(), products, draws, feed)),
        tickets: Arc::new(TicketService::new(tickets)),
    });

    log::info!("🎟️ Loffle starting on http://{}", settings.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::standard_middleware())
            .wrap(middleware::cors_policy())
            .configure(configure_routes)
    })
    .bind(settings.bind_addr)?
    .run()
    .await?;
    Ok(())
}
