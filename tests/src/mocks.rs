//! Mock implementations for testing.

use api::mailer::{Mailer, OutboundEmail};
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{
    error::DbErrorCode, Error, NewTicket, NewTicketMessage, Result, Ticket, TicketMessage,
    TicketStatus,
};
use std::sync::Arc;
use ticket_store::{MemoryStore, TicketStore};
use uuid::Uuid;

/// Ticket store that can be switched into failure mode.
///
/// Delegates to a [`MemoryStore`] so tests can seed tickets and inspect the
/// messages that the real code paths wrote.
#[derive(Clone)]
pub struct SwitchableStore {
    inner: Arc<MemoryStore>,
    /// Simulate failures if set.
    should_fail: Arc<Mutex<bool>>,
}

impl SwitchableStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryStore::new()),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    /// The backing memory store.
    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    /// Set failure mode for testing error handling.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    fn check(&self) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::database(
                DbErrorCode::StoreFailed,
                "Mock store failure",
            ));
        }
        Ok(())
    }
}

impl Default for SwitchableStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for SwitchableStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>> {
        self.check()?;
        self.inner.find_by_id(id).await
    }

    async fn insert_message(&self, message: NewTicketMessage) -> Result<TicketMessage> {
        self.check()?;
        self.inner.insert_message(message).await
    }

    async fn update_status(&self, id: Uuid, status: TicketStatus) -> Result<()> {
        self.check()?;
        self.inner.update_status(id, status).await
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket> {
        self.check()?;
        self.inner.create_ticket(ticket).await
    }

    async fn list_messages(&self, ticket_id: Uuid) -> Result<Vec<TicketMessage>> {
        self.inner.list_messages(ticket_id).await
    }

    async fn is_healthy(&self) -> bool {
        !*self.should_fail.lock()
    }
}

/// Mailer that records outbound emails instead of sending them.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All emails handed to this mailer.
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutboundEmail) -> Result<()> {
        self.sent.lock().push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_switchable_store_fails_on_demand() {
        let store = SwitchableStore::new();
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());

        store.set_should_fail(true);
        assert!(store.find_by_id(Uuid::new_v4()).await.is_err());
        assert!(!store.is_healthy().await);

        store.set_should_fail(false);
        assert!(store.is_healthy().await);
    }

    #[tokio::test]
    async fn test_recording_mailer_keeps_order() {
        let mailer = RecordingMailer::new();
        for to in ["a@x.com", "b@x.com"] {
            mailer
                .send(OutboundEmail {
                    to: to.into(),
                    subject: "s".into(),
                    body: "b".into(),
                })
                .await
                .unwrap();
        }

        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].to, "b@x.com");
    }
}
