//! Domain layer for the local-pickup marketplace.
//!
//! This crate is free of I/O. It provides:
//! - [`Cart`] with its single invariant (one line per product) and login-time
//!   [`reconcile`] of an anonymous cart into a server cart
//! - [`partition`] of a multi-producer cart into one [`OrderDraft`] per producer
//! - the [`Order`] record with its [`OrderStatus`] state machine and
//!   actor-aware transition planning
//! - the [`OrderEvent`]s consumed by the notification collaborator

pub mod actor;
pub mod cart;
pub mod order;
pub mod product;

pub use actor::{Actor, Role};
pub use cart::{Cart, CartError, CartLine, ReconcileReport, reconcile};
pub use order::{
    CancellationPolicy, DomainEvent, GroupRejection, Order, OrderCreatedData, OrderDraft,
    OrderError, OrderEvent, OrderLine, OrderParts, OrderStatus, OrderStatusChangedData,
    Partition, PaymentStatus, PaymentUpdate, PickupSelection, Recipient, TransitionPlan,
    TransitionRequest, partition,
};
pub use product::{Catalog, NewProduct, Product, ProductError};
