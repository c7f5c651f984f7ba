//! Profile directory collaborator: display names and contact details.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CustomerId, ProducerId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{QueryError, Result};

/// Public details of a customer or producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Profile {
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            email: None,
            phone: None,
        }
    }

    pub fn with_contact(mut self, email: Option<String>, phone: Option<String>) -> Self {
        self.email = email;
        self.phone = phone;
        self
    }
}

/// Source of customer and producer profiles, owned outside this core.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn customer_profile(&self, customer_id: CustomerId) -> Result<Option<Profile>>;

    async fn producer_profile(&self, producer_id: ProducerId) -> Result<Option<Profile>>;
}

#[derive(Debug, Default)]
struct DirectoryState {
    customers: HashMap<CustomerId, Profile>,
    producers: HashMap<ProducerId, Profile>,
    unavailable: bool,
}

/// In-memory directory for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_customer(&self, customer_id: CustomerId, profile: Profile) {
        self.state.write().await.customers.insert(customer_id, profile);
    }

    pub async fn insert_producer(&self, producer_id: ProducerId, profile: Profile) {
        self.state.write().await.producers.insert(producer_id, profile);
    }

    /// Makes every lookup fail.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryDirectory {
    async fn customer_profile(&self, customer_id: CustomerId) -> Result<Option<Profile>> {
        let state = self.state.read().await;
        if state.unavailable {
            return Err(QueryError::Directory("directory unavailable".to_string()));
        }
        Ok(state.customers.get(&customer_id).cloned())
    }

    async fn producer_profile(&self, producer_id: ProducerId) -> Result<Option<Profile>> {
        let state = self.state.read().await;
        if state.unavailable {
            return Err(QueryError::Directory("directory unavailable".to_string()));
        }
        Ok(state.producers.get(&producer_id).cloned())
    }
}
