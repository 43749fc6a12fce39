//! # lf-api
//!
//! The web routing and orchestration layer for Loffle.

pub mod handlers;
pub mod middleware;
pub mod responses;

use actix_web::web;

/// Configures the routes for the raffle service.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            // Raffle lifecycle
            .route("/raffles", web::post().to(handlers::create_raffle))
            .route("/raffles", web::get().to(handlers::list_raffles))
            .route("/raffles/{id}", web::get().to(handlers::get_raffle))
            .route("/raffles/{id}", web::delete().to(handlers::delete_raffle))
            .route("/raffles/{id}/apply", web::post().to(handlers::apply))
            .route(
                "/raffles/{id}/refresh-progress",
                web::post().to(handlers::refresh_progress),
            )
            .route("/raffles/{id}/resolve", web::post().to(handlers::resolve))
            .route("/raffles/{id}/applicants", web::get().to(handlers::applicants))
            .route("/raffles/{id}/candidates", web::get().to(handlers::candidates))
            .route("/raffles/{id}/winner", web::get().to(handlers::winner))
            // Ticket ledger
            .route("/tickets", web::post().to(handlers::create_ticket))
            .route("/tickets", web::get().to(handlers::list_tickets))
            .route("/tickets/{id}/buy", web::post().to(handlers::buy_ticket))
            .route(
                "/tickets/balance/{user_id}",
                web::get().to(handlers::ticket_balance),
            )
            // Product catalog
            .route("/products", web::post().to(handlers::create_product))
            .route("/products", web::get().to(handlers::list_products))
            .route("/products/{id}", web::delete().to(handlers::delete_product))
            // Weekly draw ingestion
            .route("/draws", web::post().to(handlers::record_draw))
            .route("/draws", web::get().to(handlers::list_draws)),
    );
}
