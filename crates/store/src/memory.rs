//! In-memory ticket store.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use relay_core::{
    error::DbErrorCode, Error, NewTicket, NewTicketMessage, Result, Ticket, TicketMessage,
    TicketStatus,
};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::store::TicketStore;

#[derive(Default)]
struct Inner {
    tickets: HashMap<Uuid, Ticket>,
    messages: Vec<TicketMessage>,
}

/// Process-local ticket store.
///
/// Nothing survives a restart; used for tests and single-instance setups.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed ticket, replacing any ticket with the same id.
    pub fn insert_ticket(&self, ticket: Ticket) {
        self.inner.write().tickets.insert(ticket.id, ticket);
    }

    /// Total number of stored messages.
    pub fn message_count(&self) -> usize {
        self.inner.read().messages.len()
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>> {
        Ok(self.inner.read().tickets.get(&id).cloned())
    }

    async fn insert_message(&self, message: NewTicketMessage) -> Result<TicketMessage> {
        let mut inner = self.inner.write();

        if !inner.tickets.contains_key(&message.ticket_id) {
            return Err(Error::database(
                DbErrorCode::NotFound,
                format!("ticket {} does not exist", message.ticket_id),
            ));
        }

        let stored = TicketMessage {
            id: Uuid::new_v4(),
            ticket_id: message.ticket_id,
            sender_type: message.sender_type,
            sender_name: message.sender_name,
            body: message.body,
            created_at: Utc::now(),
        };
        inner.messages.push(stored.clone());

        debug!(ticket_id = %stored.ticket_id, message_id = %stored.id, "Stored message");
        Ok(stored)
    }

    async fn update_status(&self, id: Uuid, status: TicketStatus) -> Result<()> {
        let mut inner = self.inner.write();
        let ticket = inner.tickets.get_mut(&id).ok_or_else(|| {
            Error::database(DbErrorCode::NotFound, format!("ticket {} does not exist", id))
        })?;

        ticket.status = status;
        ticket.updated_at = Utc::now();
        Ok(())
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket> {
        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            subject: ticket.subject,
            status: TicketStatus::New,
            requester_name: ticket.requester_name,
            requester_email: ticket.requester_email,
            created_at: now,
            updated_at: now,
        };
        self.insert_ticket(ticket.clone());
        Ok(ticket)
    }

    async fn list_messages(&self, ticket_id: Uuid) -> Result<Vec<TicketMessage>> {
        let mut messages: Vec<TicketMessage> = self
            .inner
            .read()
            .messages
            .iter()
            .filter(|m| m.ticket_id == ticket_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
