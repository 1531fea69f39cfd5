//! Outbound mail seam.
//!
//! Delivery belongs to the portal's mail sender; the relay only hands it
//! messages whose subject carries the ticket correlation tag.

use async_trait::async_trait;
use relay_core::Result;
use tracing::info;

/// An email to hand to the mail sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<()>;
}

/// Mailer that only logs; used when no sender is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<()> {
        info!(
            to = %email.to,
            subject = %email.subject,
            body_len = email.body.len(),
            "Outbound email not delivered (log mailer)"
        );
        Ok(())
    }
}
