use std::time::Duration;

use domain::CancellationPolicy;

/// Runtime settings for [`crate::OrderLifecycle`].
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Upper bound on one charge attempt (intent creation plus confirmation).
    pub payment_timeout: Duration,

    /// Currency code passed to the payment gateway.
    pub currency: String,

    pub cancellation: CancellationPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            payment_timeout: Duration::from_millis(5000),
            currency: "eur".to_string(),
            cancellation: CancellationPolicy::default(),
        }
    }
}
