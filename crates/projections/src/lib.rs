//! Fulfillment query layer.
//!
//! Read-only views over committed orders:
//! - [`CustomerOrderView`]: a customer's orders with each producer's display name
//! - [`ProducerOrderView`]: a producer's orders with each customer's name and contact
//! - [`ProfileDirectory`] collaborator supplying display names
//!
//! Views never write. Dates are rendered in one canonical form, see [`format`].

pub mod directory;
pub mod error;
pub mod format;
pub mod queries;
pub mod views;

pub use directory::{InMemoryDirectory, Profile, ProfileDirectory};
pub use error::{QueryError, Result};
pub use queries::FulfillmentQueries;
pub use views::{ContactView, CustomerOrderView, LineView, ProducerOrderView};
