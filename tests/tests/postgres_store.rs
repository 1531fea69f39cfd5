//! Tests for the Postgres ticket store.
//!
//! Skipped unless `RELAY_TEST_DATABASE_URL` points at a disposable database.

use relay_core::{NewTicket, NewTicketMessage, TicketStatus};
use ticket_store::{health::init_schema, PgTicketStore, StoreConfig, TicketStore};
use uuid::Uuid;

async fn connect() -> Option<PgTicketStore> {
    let url = std::env::var("RELAY_TEST_DATABASE_URL").ok()?;
    let config = StoreConfig {
        url,
        max_connections: 2,
        ..StoreConfig::default()
    };

    let store = PgTicketStore::connect(&config)
        .await
        .expect("Failed to connect to test database");
    init_schema(store.pool())
        .await
        .expect("Failed to initialize schema");
    Some(store)
}

fn new_ticket() -> NewTicket {
    NewTicket {
        subject: "Help".into(),
        requester_name: "Jane Doe".into(),
        requester_email: format!("jane+{}@x.com", Uuid::new_v4()),
    }
}

/// Append to a resolved ticket reopens it in the same transaction
#[tokio::test]
async fn test_append_reopens_resolved_ticket() {
    let Some(store) = connect().await else {
        return;
    };

    let ticket = store.create_ticket(new_ticket()).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::New);

    store
        .update_status(ticket.id, TicketStatus::Resolved)
        .await
        .unwrap();
    let resolved = store.find_by_id(ticket.id).await.unwrap().unwrap();

    let (message, reopened) = store
        .append_user_message(
            &resolved,
            NewTicketMessage::from_user(ticket.id, "Jane Doe", "Thanks!"),
        )
        .await
        .unwrap();

    assert!(reopened);
    assert_eq!(message.body, "Thanks!");

    let ticket = store.find_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::InProgress);

    let messages = store.list_messages(ticket.id).await.unwrap();
    assert_eq!(messages.len(), 1);
}

/// Append to an open ticket leaves its status alone
#[tokio::test]
async fn test_append_keeps_open_status() {
    let Some(store) = connect().await else {
        return;
    };

    let ticket = store.create_ticket(new_ticket()).await.unwrap();
    let (_, reopened) = store
        .append_user_message(
            &ticket,
            NewTicketMessage::from_user(ticket.id, "Jane Doe", "More detail"),
        )
        .await
        .unwrap();

    assert!(!reopened);
    let ticket = store.find_by_id(ticket.id).await.unwrap().unwrap();
    assert_eq!(ticket.status, TicketStatus::New);
}

/// Unknown ids are not found and updates on them fail
#[tokio::test]
async fn test_unknown_ticket() {
    let Some(store) = connect().await else {
        return;
    };

    let id = Uuid::new_v4();
    assert!(store.find_by_id(id).await.unwrap().is_none());

    let err = store
        .update_status(id, TicketStatus::InProgress)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), Some("DB_002"));
}
