//! Caller identity.
//!
//! The authentication collaborator verifies who is calling; this core only ever
//! receives the result as an explicit [`Actor`] argument.

use common::{CustomerId, ProducerId};
use serde::{Deserialize, Serialize};

/// The role half of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Producer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Producer => "producer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "producer" => Ok(Role::Producer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A verified caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "lowercase")]
pub enum Actor {
    Customer(CustomerId),
    Producer(ProducerId),
}

impl Actor {
    pub fn role(&self) -> Role {
        match self {
            Actor::Customer(_) => Role::Customer,
            Actor::Producer(_) => Role::Producer,
        }
    }

    /// Returns the customer id if this actor is a customer.
    pub fn customer_id(&self) -> Option<CustomerId> {
        match self {
            Actor::Customer(id) => Some(*id),
            Actor::Producer(_) => None,
        }
    }

    /// Returns the producer id if this actor is a producer.
    pub fn producer_id(&self) -> Option<ProducerId> {
        match self {
            Actor::Producer(id) => Some(*id),
            Actor::Customer(_) => None,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Customer(id) => write!(f, "customer:{id}"),
            Actor::Producer(id) => write!(f, "producer:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_accessors() {
        let customer = Actor::Customer(CustomerId::new());
        assert_eq!(customer.role(), Role::Customer);
        assert!(customer.customer_id().is_some());
        assert!(customer.producer_id().is_none());

        let producer = Actor::Producer(ProducerId::new());
        assert_eq!(producer.role(), Role::Producer);
        assert!(producer.producer_id().is_some());
        assert!(producer.customer_id().is_none());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Producer".parse::<Role>().unwrap(), Role::Producer);
        assert_eq!("customer".parse::<Role>().unwrap(), Role::Customer);
        assert!("admin".parse::<Role>().is_err());
    }
}
