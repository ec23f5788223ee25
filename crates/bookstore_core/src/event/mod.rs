//! In-process domain events.
//!
//! # Responsibility
//! - Carry facts about completed writes (orders placed, members registered)
//!   from services to independent listeners.
//!
//! # Invariants
//! - Delivery is synchronous and follows subscription order.
//! - A failing listener is logged and skipped; it never fails the publisher
//!   or starves later listeners.

use crate::model::member::{MemberId, MembershipType};
use crate::model::order::OrderId;
use log::{debug, warn};
use std::error::Error;
use std::sync::Arc;

pub mod email;

pub use email::{EmailError, EmailMessage, EmailNotifier, EmailSender, LogEmailSender};

/// Facts published by services after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    OrderPlaced {
        order_id: OrderId,
        total_amount: i64,
        book_titles: Vec<String>,
    },
    OrderShipped {
        order_id: OrderId,
    },
    MemberRegistered {
        member_id: MemberId,
        name: String,
        email: String,
    },
    MembershipUpgraded {
        member_id: MemberId,
        email: String,
        from: MembershipType,
        to: MembershipType,
    },
}

impl DomainEvent {
    /// Stable event name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "order_placed",
            Self::OrderShipped { .. } => "order_shipped",
            Self::MemberRegistered { .. } => "member_registered",
            Self::MembershipUpgraded { .. } => "membership_upgraded",
        }
    }
}

pub type ListenerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Receiver of domain events.
pub trait EventListener: Send + Sync {
    fn name(&self) -> &'static str;
    fn on_event(&self, event: &DomainEvent) -> ListenerResult;
}

/// Ordered list of listeners with synchronous fan-out.
#[derive(Default, Clone)]
pub struct EventBus {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener; it runs after every listener added before it.
    pub fn subscribe(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.subscribe(listener);
        self
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers `event` to every listener and returns how many succeeded.
    pub fn publish(&self, event: &DomainEvent) -> usize {
        let mut delivered = 0;
        for listener in &self.listeners {
            match listener.on_event(event) {
                Ok(()) => {
                    delivered += 1;
                    debug!(
                        "event=event_publish module=event status=ok event_name={} listener={}",
                        event.name(),
                        listener.name()
                    );
                }
                Err(err) => warn!(
                    "event=event_publish module=event status=error event_name={} listener={} error={}",
                    event.name(),
                    listener.name(),
                    err
                ),
            }
        }
        delivered
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.listeners.iter().map(|l| l.name()).collect();
        f.debug_struct("EventBus").field("listeners", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{DomainEvent, EventBus, EventListener, ListenerResult};
    use std::sync::{Arc, Mutex};

    struct Recording {
        name: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl EventListener for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn on_event(&self, _event: &DomainEvent) -> ListenerResult {
            self.seen.lock().expect("lock").push(self.name);
            if self.fail {
                return Err("boom".into());
            }
            Ok(())
        }
    }

    #[test]
    fn failing_listener_does_not_stop_later_ones() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let bus = EventBus::new()
            .with_listener(Arc::new(Recording {
                name: "first",
                seen: Arc::clone(&seen),
                fail: true,
            }))
            .with_listener(Arc::new(Recording {
                name: "second",
                seen: Arc::clone(&seen),
                fail: false,
            }));

        let delivered = bus.publish(&DomainEvent::OrderShipped { order_id: 7 });

        assert_eq!(delivered, 1);
        assert_eq!(*seen.lock().expect("lock"), vec!["first", "second"]);
    }

    #[test]
    fn empty_bus_delivers_nothing() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(&DomainEvent::OrderShipped { order_id: 1 }), 0);
        assert_eq!(bus.listener_count(), 0);
    }
}
