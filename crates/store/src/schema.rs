//! Ticket table schemas.
//!
//! Only the tables this service mutates. Statuses and sender types are stored
//! as text and checked by constraint.

/// SQL for creating the tickets table.
pub const CREATE_TICKETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tickets (
    id UUID PRIMARY KEY,
    subject TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'new'
        CHECK (status IN ('new', 'in_progress', 'resolved')),
    requester_name TEXT NOT NULL,
    requester_email TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// SQL for creating the ticket messages table.
pub const CREATE_TICKET_MESSAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ticket_messages (
    id UUID PRIMARY KEY,
    ticket_id UUID NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
    sender_type TEXT NOT NULL CHECK (sender_type IN ('user', 'admin')),
    sender_name TEXT NOT NULL,
    body TEXT NOT NULL CHECK (length(body) > 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// Messages are always read per ticket in creation order.
pub const CREATE_TICKET_MESSAGES_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS ticket_messages_ticket_created_idx
    ON ticket_messages (ticket_id, created_at)
"#;

/// Returns all DDL statements in dependency order.
pub fn all_tables() -> Vec<&'static str> {
    vec![
        CREATE_TICKETS_TABLE,
        CREATE_TICKET_MESSAGES_TABLE,
        CREATE_TICKET_MESSAGES_INDEX,
    ]
}
