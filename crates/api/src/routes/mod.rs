//! HTTP route handlers.

pub mod cart;
pub mod checkout;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod views;

use std::str::FromStr;

use common::Money;
use uuid::Uuid;

use crate::error::ApiError;

/// Parses a path or body identifier into one of the typed ids.
pub(crate) fn parse_id<T: From<Uuid>>(kind: &str, id: &str) -> Result<T, ApiError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {kind} id {id:?}: {e}")))?;
    Ok(T::from(uuid))
}

/// Parses a decimal amount such as `"3.50"`.
pub(crate) fn parse_money(field: &str, amount: &str) -> Result<Money, ApiError> {
    Money::from_str(amount)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}
