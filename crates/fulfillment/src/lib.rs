//! Services for the order-creation and fulfillment subsystem.
//!
//! - [`CartService`]: the server cart and login-time reconciliation
//! - [`CatalogService`]: thin product CRUD for producers
//! - [`OrderLifecycle`]: checkout (partition + atomic commit per producer group),
//!   status transitions, payment and notifications
//!
//! Every operation takes the caller's [`domain::Actor`] explicitly.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod services;

pub use cart::{CartService, MergeOutcome};
pub use catalog::CatalogService;
pub use checkout::{CheckoutOutcome, CheckoutRequest, GroupFailure, PaymentInstruction};
pub use config::LifecycleConfig;
pub use error::{FulfillmentError, Result};
pub use lifecycle::OrderLifecycle;
pub use services::{
    InMemoryNotifier, InMemoryPaymentGateway, Notifier, PaymentGateway, PaymentOutcome,
    TracingNotifier,
};
