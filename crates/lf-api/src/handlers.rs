//! # lf-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the service
//! layer. Handlers stamp the request time once and pass it down so every
//! decision inside a request observes the same instant.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lf_core::{AppError, Product, Progress};
use lf_services::{NewRaffle, RaffleService, TicketService};

use crate::responses::ApiError;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub raffles: Arc<RaffleService>,
    pub tickets: Arc<TicketService>,
}

type ApiResult = Result<HttpResponse, ApiError>;

#[derive(Deserialize)]
pub struct CreateRaffleRequest {
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub target_quantity: u32,
    pub user_id: Uuid,
    pub product_id: Uuid,
}

#[derive(Deserialize)]
pub struct UserRequest {
    pub user_id: Uuid,
}

#[derive(Serialize)]
struct ApplyResponse {
    ordinal_number: u32,
}

#[derive(Serialize)]
struct RefreshResponse {
    before: Progress,
    after: Progress,
}

#[derive(Serialize)]
struct ResolveResponse {
    resolved: bool,
}

#[derive(Deserialize)]
pub struct CreateTicketRequest {
    pub quantity: u32,
    pub price: i64,
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub size: String,
    pub brand: String,
    pub serial: String,
    pub color: String,
    pub release_date: NaiveDate,
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct RecordDrawRequest {
    pub draw_date: NaiveDate,
    pub bonus_number: Option<u8>,
}

#[derive(Serialize)]
struct RecordDrawResponse {
    draw: lf_core::LotteryDraw,
    resolved_winners: u32,
}

pub async fn create_raffle(
    data: web::Data<AppState>,
    body: web::Json<CreateRaffleRequest>,
) -> ApiResult {
    let body = body.into_inner();
    let raffle = data
        .raffles
        .create_raffle(
            NewRaffle {
                start_date_time: body.start_date_time,
                end_date_time: body.end_date_time,
                target_quantity: body.target_quantity,
                user_id: body.user_id,
                product_id: body.product_id,
            },
            Utc::now(),
        )
        .await?;
    Ok(HttpResponse::Created().json(raffle))
}

pub async fn list_raffles(data: web::Data<AppState>) -> ApiResult {
    Ok(HttpResponse::Ok().json(data.raffles.list_raffles().await?))
}

pub async fn get_raffle(data: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult {
    Ok(HttpResponse::Ok().json(data.raffles.get_raffle(path.into_inner()).await?))
}

pub async fn delete_raffle(data: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult {
    data.raffles.delete_raffle(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn apply(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UserRequest>,
) -> ApiResult {
    let ordinal_number = data
        .raffles
        .apply(path.into_inner(), body.user_id, Utc::now())
        .await?;
    Ok(HttpResponse::Created().json(ApplyResponse { ordinal_number }))
}

pub async fn refresh_progress(data: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult {
    let (before, after) = data
        .raffles
        .refresh_progress(path.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(RefreshResponse { before, after }))
}

pub async fn resolve(data: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult {
    let resolved = data
        .raffles
        .resolve_one(path.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ResolveResponse { resolved }))
}

pub async fn applicants(data: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult {
    Ok(HttpResponse::Ok().json(data.raffles.applicants(path.into_inner()).await?))
}

pub async fn candidates(data: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult {
    Ok(HttpResponse::Ok().json(data.raffles.candidates(path.into_inner()).await?))
}

pub async fn winner(data: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult {
    let raffle_id = path.into_inner();
    match data.raffles.winner(raffle_id).await? {
        Some(winner) => Ok(HttpResponse::Ok().json(winner)),
        None => Err(ApiError(AppError::NotFound(
            "Winner".into(),
            raffle_id.to_string(),
        ))),
    }
}

pub async fn create_ticket(
    data: web::Data<AppState>,
    body: web::Json<CreateTicketRequest>,
) -> ApiResult {
    let ticket = data
        .tickets
        .create_ticket(body.quantity, body.price, Utc::now())
        .await?;
    Ok(HttpResponse::Created().json(ticket))
}

pub async fn list_tickets(data: web::Data<AppState>) -> ApiResult {
    Ok(HttpResponse::Ok().json(data.tickets.list_tickets().await?))
}

pub async fn buy_ticket(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UserRequest>,
) -> ApiResult {
    let purchase = data
        .tickets
        .buy(path.into_inner(), body.user_id, Utc::now())
        .await?;
    Ok(HttpResponse::Created().json(purchase))
}

pub async fn ticket_balance(data: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult {
    Ok(HttpResponse::Ok().json(data.tickets.balance(path.into_inner()).await?))
}

pub async fn create_product(
    data: web::Data<AppState>,
    body: web::Json<CreateProductRequest>,
) -> ApiResult {
    let body = body.into_inner();
    let product = data
        .raffles
        .create_product(Product::new(
            body.name,
            body.size,
            body.brand,
            body.serial,
            body.color,
            body.release_date,
            body.user_id,
            Utc::now(),
        ))
        .await?;
    Ok(HttpResponse::Created().json(product))
}

pub async fn list_products(data: web::Data<AppState>) -> ApiResult {
    Ok(HttpResponse::Ok().json(data.raffles.list_products().await?))
}

pub async fn delete_product(data: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult {
    data.raffles.delete_product(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn record_draw(
    data: web::Data<AppState>,
    body: web::Json<RecordDrawRequest>,
) -> ApiResult {
    let (draw, resolved_winners) = data
        .raffles
        .record_draw(body.draw_date, body.bonus_number, Utc::now())
        .await?;
    Ok(HttpResponse::Created().json(RecordDrawResponse {
        draw,
        resolved_winners,
    }))
}

pub async fn list_draws(data: web::Data<AppState>) -> ApiResult {
    Ok(HttpResponse::Ok().json(data.raffles.list_draws().await?))
}
