//! Common test setup functions.

use api::{
    middleware::rate_limit::{MemoryRateLimitStore, RateLimitPolicy, RateLimiter},
    router,
    state::AppState,
};
use axum::Router;
use relay_core::{Ticket, TicketMessage};
use std::sync::Arc;
use std::time::Duration;
use ticket_store::TicketStore;
use uuid::Uuid;

use crate::mocks::{RecordingMailer, SwitchableStore};

/// Test context with an in-memory store behind the real router.
///
/// Requests go through the same Axum router and middleware as production;
/// only the store and mailer are swapped for test doubles.
pub struct TestContext {
    pub store: SwitchableStore,
    pub mailer: RecordingMailer,
    pub router: Router,
}

impl TestContext {
    /// Default policy, no dedup.
    pub fn new() -> Self {
        Self::build(|state| state)
    }

    /// Custom rate limit policy over in-memory counters.
    pub fn with_policy(policy: RateLimitPolicy) -> Self {
        Self::build(|state| {
            state.with_rate_limiter(RateLimiter::new(
                Arc::new(MemoryRateLimitStore::new()),
                policy,
            ))
        })
    }

    /// Redelivery guard enabled.
    pub fn with_dedup() -> Self {
        Self::build(|state| state.with_dedup(Duration::from_secs(60)))
    }

    fn build(configure: impl FnOnce(AppState) -> AppState) -> Self {
        let store = SwitchableStore::new();
        let mailer = RecordingMailer::new();

        let state = AppState::new(Arc::new(store.clone()) as Arc<dyn TicketStore>)
            .with_mailer(Arc::new(mailer.clone()));
        let router = router(configure(state));

        Self {
            store,
            mailer,
            router,
        }
    }

    /// Seed a ticket directly into the store.
    pub fn seed(&self, ticket: Ticket) {
        self.store.memory().insert_ticket(ticket);
    }

    /// Current state of a ticket.
    pub async fn ticket(&self, id: Uuid) -> Option<Ticket> {
        self.store.memory().find_by_id(id).await.ok().flatten()
    }

    /// Messages on a ticket, oldest first.
    pub async fn messages(&self, id: Uuid) -> Vec<TicketMessage> {
        self.store
            .memory()
            .list_messages(id)
            .await
            .unwrap_or_default()
    }

    /// Set the store to fail (for error testing).
    pub fn set_store_failure(&self, should_fail: bool) {
        self.store.set_should_fail(should_fail);
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
