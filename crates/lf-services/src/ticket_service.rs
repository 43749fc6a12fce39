//! # TicketService
//!
//! Ticket catalog, purchases, and the available-to-apply balance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use lf_core::{AppError, Result, Ticket, TicketBalance, TicketPurchase, TicketRepo};

pub struct TicketService {
    tickets: Arc<dyn TicketRepo>,
}

impl TicketService {
    pub fn new(tickets: Arc<dyn TicketRepo>) -> Self {
        Self { tickets }
    }

    pub async fn create_ticket(
        &self,
        quantity: u32,
        price: i64,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        if quantity == 0 {
            return Err(AppError::Validation("ticket quantity must be positive".into()));
        }
        if price < 0 {
            return Err(AppError::Validation("ticket price must not be negative".into()));
        }
        let ticket = Ticket::new(quantity, price, now);
        self.tickets.create_ticket(ticket.clone()).await?;
        Ok(ticket)
    }

    pub async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        Ok(self.tickets.list_tickets().await?)
    }

    pub async fn buy(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TicketPurchase> {
        self.tickets
            .get_ticket(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket".into(), ticket_id.to_string()))?;

        let purchase = TicketPurchase::new(ticket_id, user_id, now);
        self.tickets.create_purchase(purchase.clone()).await?;
        info!(%ticket_id, %user_id, "ticket purchased");
        Ok(purchase)
    }

    pub async fn balance(&self, user_id: Uuid) -> Result<TicketBalance> {
        Ok(self.tickets.ticket_balance(user_id).await?)
    }
}
