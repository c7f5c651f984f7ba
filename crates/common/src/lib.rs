//! Shared identifiers and value types.
//!
//! Every entity in the marketplace is addressed by a UUID-backed newtype so that a
//! product id can never be passed where an order id is expected. Monetary amounts
//! are integer minor units ([`Money`]).

pub mod ids;
pub mod money;
pub mod version;

pub use ids::{CustomerId, OrderId, ProducerId, ProductId, SessionId};
pub use money::{Money, MoneyParseError};
pub use version::Version;
