//! Route wiring and error translation, exercised with mocked storage ports.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use lf_api::handlers::AppState;
use lf_api::{configure_routes, middleware};
use lf_core::{
    MockDrawRepo, MockProductRepo, MockRaffleRepo, MockTicketRepo, Progress, Raffle, Ticket,
    TicketBalance,
};
use lf_services::{RaffleService, TicketService};

struct Mocks {
    raffles: MockRaffleRepo,
    tickets: MockTicketRepo,
    products: MockProductRepo,
    draws: MockDrawRepo,
}

impl Mocks {
    fn new() -> Self {
        Self {
            raffles: MockRaffleRepo::new(),
            tickets: MockTicketRepo::new(),
            products: MockProductRepo::new(),
            draws: MockDrawRepo::new(),
        }
    }

    fn into_state(self) -> web::Data<AppState> {
        let tickets: Arc<dyn lf_core::TicketRepo> = Arc::new(self.tickets);
        web::Data::new(AppState {
            raffles: Arc::new(RaffleService::new(
                Arc::new(self.raffles),
                tickets.clone(),
                Arc::new(self.products),
                Arc::new(self.draws),
                None,
            )),
            tickets: Arc::new(TicketService::new(tickets)),
        })
    }
}

fn ongoing_raffle(id: Uuid) -> Raffle {
    let now = Utc::now();
    Raffle {
        id,
        start_date_time: now - Duration::days(1),
        end_date_time: now + Duration::days(1),
        announce_date_time: now + Duration::days(3),
        target_quantity: 3,
        progress: Progress::Ongoing,
        user_id: Uuid::now_v7(),
        product_id: Uuid::now_v7(),
        created_at: now - Duration::days(2),
        is_deleted: false,
    }
}

#[actix_web::test]
async fn get_raffle_returns_json_body() {
    let raffle_id = Uuid::now_v7();
    let mut mocks = Mocks::new();
    mocks
        .raffles
        .expect_get_raffle()
        .returning(move |id| Ok(Some(ongoing_raffle(id))));

    let app = test::init_service(
        App::new()
            .app_data(mocks.into_state())
            .wrap(middleware::standard_middleware())
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/raffles/{raffle_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], json!(raffle_id));
    assert_eq!(body["progress"], json!("ongoing"));
}

#[actix_web::test]
async fn missing_raffle_maps_to_404_with_code() {
    let mut mocks = Mocks::new();
    mocks.raffles.expect_get_raffle().returning(|_| Ok(None));

    let app = test::init_service(
        App::new()
            .app_data(mocks.into_state())
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/raffles/{}", Uuid::now_v7()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], json!("not_found"));
}

#[actix_web::test]
async fn duplicate_application_maps_to_409() {
    let raffle_id = Uuid::now_v7();
    let user_id = Uuid::now_v7();
    let mut mocks = Mocks::new();
    mocks
        .raffles
        .expect_get_raffle()
        .returning(move |id| Ok(Some(ongoing_raffle(id))));
    mocks
        .raffles
        .expect_find_active_application()
        .returning(move |raffle_id, user_id| {
            Ok(Some(lf_core::RaffleApplication::new(
                raffle_id,
                user_id,
                Utc::now(),
            )))
        });

    let app = test::init_service(
        App::new()
            .app_data(mocks.into_state())
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/raffles/{raffle_id}/apply"))
        .set_json(json!({ "user_id": user_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], json!("already_applied"));
}

#[actix_web::test]
async fn broke_applicant_maps_to_400() {
    let raffle_id = Uuid::now_v7();
    let mut mocks = Mocks::new();
    mocks
        .raffles
        .expect_get_raffle()
        .returning(move |id| Ok(Some(ongoing_raffle(id))));
    mocks
        .raffles
        .expect_find_active_application()
        .returning(|_, _| Ok(None));
    mocks
        .tickets
        .expect_ticket_balance()
        .returning(|_| Ok(TicketBalance::default()));

    let app = test::init_service(
        App::new()
            .app_data(mocks.into_state())
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/raffles/{raffle_id}/apply"))
        .set_json(json!({ "user_id": Uuid::now_v7() }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], json!("no_tickets_owned"));
}

#[actix_web::test]
async fn ticket_listing_and_balance_round_trip() {
    let user_id = Uuid::now_v7();
    let mut mocks = Mocks::new();
    mocks
        .tickets
        .expect_list_tickets()
        .returning(|| Ok(vec![Ticket::new(3, 1_000, Utc::now())]));
    mocks.tickets.expect_ticket_balance().returning(|_| {
        Ok(TicketBalance {
            bought: 5,
            used: 3,
            returned: 1,
        })
    });

    let app = test::init_service(
        App::new()
            .app_data(mocks.into_state())
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/tickets").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri(&format!("/tickets/balance/{user_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["bought"], json!(5));
    assert_eq!(body["used"], json!(3));
    assert_eq!(body["returned"], json!(1));
}

#[actix_web::test]
async fn non_saturday_draw_maps_to_400() {
    let mocks = Mocks::new();

    let app = test::init_service(
        App::new()
            .app_data(mocks.into_state())
            .configure(configure_routes),
    )
    .await;

    // 2021-09-10 is a Friday
    let req = test::TestRequest::post()
        .uri("/draws")
        .set_json(json!({ "draw_date": "2021-09-10", "bonus_number": 7 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], json!("draw_date_invalid"));
}
