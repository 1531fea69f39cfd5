//! Support ticket types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Ticket lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    New,
    InProgress,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }

    /// Status a ticket moves to when the requester replies.
    ///
    /// Only resolved tickets are reopened; new and in-progress tickets keep
    /// their status.
    pub fn on_user_reply(self) -> Option<TicketStatus> {
        match self {
            Self::Resolved => Some(Self::InProgress),
            Self::New | Self::InProgress => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// Who authored a ticket message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Admin,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for SenderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(Error::validation(format!("unknown sender type: {}", other))),
        }
    }
}

/// A support ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Correlation identifier embedded in notification subjects
    pub id: Uuid,
    pub subject: String,
    pub status: TicketStatus,
    pub requester_name: String,
    pub requester_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to open a ticket.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub subject: String,
    pub requester_name: String,
    pub requester_email: String,
}

/// A message in a ticket conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender_type: SenderType,
    pub sender_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A message before the store assigns its id and timestamp.
#[derive(Debug, Clone)]
pub struct NewTicketMessage {
    pub ticket_id: Uuid,
    pub sender_type: SenderType,
    pub sender_name: String,
    pub body: String,
}

impl NewTicketMessage {
    /// A message written by the ticket's requester.
    pub fn from_user(ticket_id: Uuid, sender_name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            ticket_id,
            sender_type: SenderType::User,
            sender_name: sender_name.into(),
            body: body.into(),
        }
    }
}
