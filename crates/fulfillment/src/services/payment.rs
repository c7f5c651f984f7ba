//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::Money;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::FulfillmentError;

/// Result of confirming a payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Paid,
    Failed,
}

/// Opaque payment collaborator.
///
/// The core stores the identifiers this returns and implements none of the
/// payment protocol itself.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent and returns its id.
    async fn create_payment_intent(
        &self,
        amount: Money,
        currency: &str,
    ) -> Result<String, FulfillmentError>;

    /// Confirms an intent with the customer's payment method.
    async fn confirm(
        &self,
        intent_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentOutcome, FulfillmentError>;
}

#[derive(Debug, Clone)]
struct Intent {
    amount: Money,
    currency: String,
    outcome: Option<PaymentOutcome>,
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    intents: HashMap<String, Intent>,
    next_id: u32,
    fail_on_create: bool,
    decline: bool,
    confirm_delay: Option<Duration>,
}

/// In-memory payment gateway for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway that approves every payment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to error on intent creation.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Configures the gateway to decline confirmations.
    pub async fn set_decline(&self, decline: bool) {
        self.state.write().await.decline = decline;
    }

    /// Makes every confirmation wait this long before answering.
    pub async fn set_confirm_delay(&self, delay: Option<Duration>) {
        self.state.write().await.confirm_delay = delay;
    }

    /// Returns the number of intents created so far.
    pub async fn intent_count(&self) -> usize {
        self.state.read().await.intents.len()
    }

    /// Returns the amount and currency an intent was created for.
    pub async fn intent_amount(&self, intent_id: &str) -> Option<(Money, String)> {
        self.state
            .read()
            .await
            .intents
            .get(intent_id)
            .map(|intent| (intent.amount, intent.currency.clone()))
    }

    /// Returns the recorded outcome of an intent, if it was confirmed.
    pub async fn outcome_of(&self, intent_id: &str) -> Option<PaymentOutcome> {
        self.state
            .read()
            .await
            .intents
            .get(intent_id)
            .and_then(|intent| intent.outcome)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_payment_intent(
        &self,
        amount: Money,
        currency: &str,
    ) -> Result<String, FulfillmentError> {
        let mut state = self.state.write().await;

        if state.fail_on_create {
            return Err(FulfillmentError::PaymentGateway(
                "Payment gateway unavailable".to_string(),
            ));
        }

        state.next_id += 1;
        let intent_id = format!("pi_{:06}", state.next_id);
        state.intents.insert(
            intent_id.clone(),
            Intent {
                amount,
                currency: currency.to_string(),
                outcome: None,
            },
        );

        Ok(intent_id)
    }

    async fn confirm(
        &self,
        intent_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentOutcome, FulfillmentError> {
        let delay = self.state.read().await.confirm_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().await;
        let outcome = if state.decline || payment_method_id.is_empty() {
            PaymentOutcome::Failed
        } else {
            PaymentOutcome::Paid
        };

        let intent = state.intents.get_mut(intent_id).ok_or_else(|| {
            FulfillmentError::PaymentGateway(format!("Unknown payment intent: {intent_id}"))
        })?;
        intent.outcome = Some(outcome);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_confirm() {
        let gateway = InMemoryPaymentGateway::new();

        let intent = gateway
            .create_payment_intent(Money::from_cents(1200), "eur")
            .await
            .unwrap();
        assert!(intent.starts_with("pi_"));
        assert_eq!(
            gateway.intent_amount(&intent).await,
            Some((Money::from_cents(1200), "eur".to_string()))
        );

        let outcome = gateway.confirm(&intent, "pm_card").await.unwrap();
        assert_eq!(outcome, PaymentOutcome::Paid);
        assert_eq!(gateway.outcome_of(&intent).await, Some(PaymentOutcome::Paid));
    }

    #[tokio::test]
    async fn test_decline() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_decline(true).await;

        let intent = gateway
            .create_payment_intent(Money::from_cents(500), "eur")
            .await
            .unwrap();
        let outcome = gateway.confirm(&intent, "pm_card").await.unwrap();
        assert_eq!(outcome, PaymentOutcome::Failed);
    }

    #[tokio::test]
    async fn test_fail_on_create() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_create(true).await;

        let result = gateway
            .create_payment_intent(Money::from_cents(500), "eur")
            .await;
        assert!(matches!(result, Err(FulfillmentError::PaymentGateway(_))));
        assert_eq!(gateway.intent_count().await, 0);
    }

    #[tokio::test]
    async fn test_confirm_unknown_intent() {
        let gateway = InMemoryPaymentGateway::new();
        let result = gateway.confirm("pi_missing", "pm_card").await;
        assert!(result.is_err());
    }
}
