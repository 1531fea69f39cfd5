//! Postgres ticket store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::{
    error::DbErrorCode, Error, NewTicket, NewTicketMessage, Result, Ticket, TicketMessage,
    TicketStatus,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::store::TicketStore;

const TICKET_COLUMNS: &str =
    "id, subject, status, requester_name, requester_email, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, ticket_id, sender_type, sender_name, body, created_at";

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    subject: String,
    status: String,
    requester_name: String,
    requester_email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = Error;

    fn try_from(row: TicketRow) -> Result<Self> {
        Ok(Ticket {
            id: row.id,
            subject: row.subject,
            status: row.status.parse()?,
            requester_name: row.requester_name,
            requester_email: row.requester_email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    ticket_id: Uuid,
    sender_type: String,
    sender_name: String,
    body: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for TicketMessage {
    type Error = Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(TicketMessage {
            id: row.id,
            ticket_id: row.ticket_id,
            sender_type: row.sender_type.parse()?,
            sender_name: row.sender_name,
            body: row.body,
            created_at: row.created_at,
        })
    }
}

fn store_error(e: sqlx::Error) -> Error {
    Error::database(DbErrorCode::StoreFailed, e.to_string())
}

/// Ticket store over a Postgres connection pool.
#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    /// Connects a pool using the given configuration.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.timeout_secs))
            .connect(&config.url)
            .await
            .map_err(store_error)?;

        info!(
            max_connections = config.max_connections,
            "Connected Postgres ticket store"
        );

        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>> {
        let sql = format!("SELECT {} FROM tickets WHERE id = $1", TICKET_COLUMNS);
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        row.map(Ticket::try_from).transpose()
    }

    async fn insert_message(&self, message: NewTicketMessage) -> Result<TicketMessage> {
        let sql = format!(
            "INSERT INTO ticket_messages (id, ticket_id, sender_type, sender_name, body) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            MESSAGE_COLUMNS
        );
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(message.ticket_id)
            .bind(message.sender_type.as_str())
            .bind(&message.sender_name)
            .bind(&message.body)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        TicketMessage::try_from(row)
    }

    async fn update_status(&self, id: Uuid, status: TicketStatus) -> Result<()> {
        let result = sqlx::query("UPDATE tickets SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::database(
                DbErrorCode::NotFound,
                format!("ticket {} does not exist", id),
            ));
        }

        Ok(())
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket> {
        let sql = format!(
            "INSERT INTO tickets (id, subject, status, requester_name, requester_email) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            TICKET_COLUMNS
        );
        let row = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&ticket.subject)
            .bind(TicketStatus::New.as_str())
            .bind(&ticket.requester_name)
            .bind(&ticket.requester_email)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        Ticket::try_from(row)
    }

    async fn list_messages(&self, ticket_id: Uuid) -> Result<Vec<TicketMessage>> {
        let sql = format!(
            "SELECT {} FROM ticket_messages WHERE ticket_id = $1 ORDER BY created_at, id",
            MESSAGE_COLUMNS
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(ticket_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        rows.into_iter().map(TicketMessage::try_from).collect()
    }

    async fn is_healthy(&self) -> bool {
        crate::health::check_connection(&self.pool).await
    }

    /// Inserts the message and reopens the ticket in one transaction.
    ///
    /// The reopen is conditional on the stored status, not the caller's copy,
    /// so a concurrent status change is never overwritten.
    async fn append_user_message(
        &self,
        ticket: &Ticket,
        message: NewTicketMessage,
    ) -> Result<(TicketMessage, bool)> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let sql = format!(
            "INSERT INTO ticket_messages (id, ticket_id, sender_type, sender_name, body) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            MESSAGE_COLUMNS
        );
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(message.ticket_id)
            .bind(message.sender_type.as_str())
            .bind(&message.sender_name)
            .bind(&message.body)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_error)?;

        let reopened = sqlx::query(
            "UPDATE tickets SET status = $2, updated_at = now() WHERE id = $1 AND status = $3",
        )
        .bind(ticket.id)
        .bind(TicketStatus::InProgress.as_str())
        .bind(TicketStatus::Resolved.as_str())
        .execute(&mut *tx)
        .await
        .map_err(store_error)?
        .rows_affected()
            > 0;

        tx.commit().await.map_err(store_error)?;

        debug!(ticket_id = %ticket.id, reopened = reopened, "Appended user message");
        Ok((TicketMessage::try_from(row)?, reopened))
    }
}
