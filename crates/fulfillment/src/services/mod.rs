//! Collaborator traits and their in-process implementations.

pub mod notifier;
pub mod payment;

pub use notifier::{InMemoryNotifier, Notifier, TracingNotifier};
pub use payment::{InMemoryPaymentGateway, PaymentGateway, PaymentOutcome};
