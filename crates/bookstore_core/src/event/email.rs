//! Email notifications driven by domain events.
//!
//! Order notices go to the store's own address; member notices go to the
//! member.

use crate::event::{DomainEvent, EventListener, ListenerResult};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailError {
    pub message: String,
}

impl Display for EmailError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "email delivery failed: {}", self.message)
    }
}

impl Error for EmailError {}

/// Outgoing mail transport.
pub trait EmailSender: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Transport that writes each message to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(
            "event=email_send module=event status=ok transport=log from={} to={} subject={:?} body_len={}",
            message.from,
            message.to,
            message.subject,
            message.body.len()
        );
        Ok(())
    }
}

/// Event listener that turns domain events into emails.
pub struct EmailNotifier<S: EmailSender> {
    sender: S,
    from: String,
}

impl<S: EmailSender> EmailNotifier<S> {
    pub fn new(sender: S, from: impl Into<String>) -> Self {
        Self {
            sender,
            from: from.into(),
        }
    }

    /// Renders the message for `event`.
    pub fn compose(&self, event: &DomainEvent) -> EmailMessage {
        let (to, subject, body) = match event {
            DomainEvent::OrderPlaced {
                order_id,
                total_amount,
                book_titles,
            } => {
                let mut body = format!("Order {order_id} received.\nTotal: {total_amount}\nBooks:\n");
                for title in book_titles {
                    body.push_str("  - ");
                    body.push_str(title);
                    body.push('\n');
                }
                (
                    self.from.clone(),
                    format!("Order confirmation #{order_id}"),
                    body,
                )
            }
            DomainEvent::OrderShipped { order_id } => (
                self.from.clone(),
                format!("Order #{order_id} shipped"),
                format!("Order {order_id} has left the warehouse."),
            ),
            DomainEvent::MemberRegistered { name, email, .. } => (
                email.clone(),
                "Welcome to the bookstore".to_string(),
                format!("Hello {name}, your membership is active."),
            ),
            DomainEvent::MembershipUpgraded {
                email, from, to, ..
            } => (
                email.clone(),
                "Membership upgraded".to_string(),
                format!("Your membership changed from {from} to {to}."),
            ),
        };

        EmailMessage {
            from: self.from.clone(),
            to,
            subject,
            body,
        }
    }
}

impl<S: EmailSender> EventListener for EmailNotifier<S> {
    fn name(&self) -> &'static str {
        "email_notifier"
    }

    fn on_event(&self, event: &DomainEvent) -> ListenerResult {
        self.sender.send(&self.compose(event))?;
        Ok(())
    }
}
