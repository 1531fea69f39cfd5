//! Core types, errors, and reply extraction for the ticket relay.

pub mod error;
pub mod limits;
pub mod reply;
pub mod ticket;

pub use error::{Error, Result};
pub use ticket::*;
