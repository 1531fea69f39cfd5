//! Ticket store interface.

use async_trait::async_trait;
use relay_core::{NewTicket, NewTicketMessage, Result, Ticket, TicketMessage, TicketStatus};
use uuid::Uuid;

/// Storage operations the relay performs on tickets.
///
/// Implemented by `PgTicketStore` in production and `MemoryStore` for tests
/// and single-instance development.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Looks up a ticket by its correlation identifier.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>>;

    /// Inserts a message; the store assigns its id and timestamp.
    async fn insert_message(&self, message: NewTicketMessage) -> Result<TicketMessage>;

    /// Sets a ticket's status.
    async fn update_status(&self, id: Uuid, status: TicketStatus) -> Result<()>;

    /// Opens a ticket with status `new`.
    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket>;

    /// Messages of a ticket, oldest first.
    async fn list_messages(&self, ticket_id: Uuid) -> Result<Vec<TicketMessage>>;

    /// Whether the store is reachable.
    async fn is_healthy(&self) -> bool;

    /// Appends a requester reply and reopens the ticket if it was resolved.
    ///
    /// Returns the message and whether the ticket was reopened. The default
    /// runs two independent writes: a failure after the insert leaves the
    /// message on a still-resolved ticket. Stores with transactions override
    /// this to make both writes atomic.
    async fn append_user_message(
        &self,
        ticket: &Ticket,
        message: NewTicketMessage,
    ) -> Result<(TicketMessage, bool)> {
        let message = self.insert_message(message).await?;

        match ticket.status.on_user_reply() {
            Some(next) => {
                self.update_status(ticket.id, next).await?;
                Ok((message, true))
            }
            None => Ok((message, false)),
        }
    }
}
