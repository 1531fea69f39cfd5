//! Ticket store collaborator for the ticket relay.

pub mod config;
pub mod health;
pub mod memory;
pub mod postgres;
pub mod schema;
pub mod store;

pub use config::*;
pub use memory::MemoryStore;
pub use postgres::PgTicketStore;
pub use store::TicketStore;
