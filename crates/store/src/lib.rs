//! Persistence for the marketplace.
//!
//! [`MarketStore`] is the single storage seam used by the services. Every
//! operation that must be atomic (order commit with its stock decrements,
//! conditional status changes, versioned cart writes) is one call on the trait,
//! so callers never compose read-check-write sequences themselves.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryMarketStore;
pub use postgres::PostgresMarketStore;
pub use store::{MarketStore, sort_newest_first};
