//! Notification collaborator: receives order events after they are committed.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{DomainEvent, OrderEvent, Recipient};
use tokio::sync::RwLock;

use crate::error::FulfillmentError;

/// Consumer of order events. Delivery and retries are the implementation's
/// concern; a failure here never undoes the operation that produced the event.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event: &OrderEvent) -> Result<(), FulfillmentError>;
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    events: Vec<OrderEvent>,
    fail_on_publish: bool,
}

/// Records published events for inspection in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to reject every event.
    pub async fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().await.fail_on_publish = fail;
    }

    pub async fn events(&self) -> Vec<OrderEvent> {
        self.state.read().await.events.clone()
    }

    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    /// Events addressed to the given recipient, in publish order.
    pub async fn events_for(&self, recipient: Recipient) -> Vec<OrderEvent> {
        self.state
            .read()
            .await
            .events
            .iter()
            .filter(|event| event.recipients().contains(&recipient))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn publish(&self, event: &OrderEvent) -> Result<(), FulfillmentError> {
        let mut state = self.state.write().await;
        if state.fail_on_publish {
            return Err(FulfillmentError::Notification(
                "Notification channel unavailable".to_string(),
            ));
        }
        state.events.push(event.clone());
        Ok(())
    }
}

/// Writes one structured log line per recipient.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn publish(&self, event: &OrderEvent) -> Result<(), FulfillmentError> {
        let order = event.order();
        for recipient in event.recipients() {
            tracing::info!(
                event_type = event.event_type(),
                order_id = %order.id(),
                status = %order.status(),
                ?recipient,
                "order notification"
            );
        }
        Ok(())
    }
}
