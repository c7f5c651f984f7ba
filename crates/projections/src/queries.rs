//! Read-only order queries for customers and producers.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use domain::{Actor, Order};
use futures_util::future::join_all;
use store::{MarketStore, sort_newest_first};

use crate::directory::{Profile, ProfileDirectory};
use crate::error::{QueryError, Result};
use crate::views::{CustomerOrderView, ProducerOrderView};

/// Builds the customer and producer order views.
///
/// Every call reads the latest committed orders; nothing is cached and
/// nothing is written.
#[derive(Clone)]
pub struct FulfillmentQueries<S, D>
where
    S: MarketStore,
    D: ProfileDirectory,
{
    store: S,
    directory: D,
}

impl<S, D> FulfillmentQueries<S, D>
where
    S: MarketStore,
    D: ProfileDirectory,
{
    pub fn new(store: S, directory: D) -> Self {
        Self { store, directory }
    }

    /// The caller's orders, newest first, each with its producer's name.
    #[tracing::instrument(skip(self))]
    pub async fn customer_orders(&self, actor: &Actor) -> Result<Vec<CustomerOrderView>> {
        let customer_id = actor
            .customer_id()
            .ok_or_else(|| wrong_role(actor, "customer"))?;
        metrics::counter!("fulfillment_view_requests_total", "view" => "customer").increment(1);

        let mut orders = self.store.orders_for_customer(customer_id).await?;
        sort_newest_first(&mut orders);

        let producers = self
            .resolve(distinct(&orders, Order::producer_id), |id| {
                self.directory.producer_profile(id)
            })
            .await;

        Ok(orders
            .iter()
            .map(|order| CustomerOrderView::build(order, producers.get(&order.producer_id())))
            .collect())
    }

    /// Orders placed with the caller, newest first, with customer contact details.
    #[tracing::instrument(skip(self))]
    pub async fn producer_orders(&self, actor: &Actor) -> Result<Vec<ProducerOrderView>> {
        let producer_id = actor
            .producer_id()
            .ok_or_else(|| wrong_role(actor, "producer"))?;
        metrics::counter!("fulfillment_view_requests_total", "view" => "producer").increment(1);

        let mut orders = self.store.orders_for_producer(producer_id).await?;
        sort_newest_first(&mut orders);

        let customers = self
            .resolve(distinct(&orders, Order::customer_id), |id| {
                self.directory.customer_profile(id)
            })
            .await;

        Ok(orders
            .iter()
            .map(|order| ProducerOrderView::build(order, customers.get(&order.customer_id())))
            .collect())
    }

    /// Looks up every id concurrently. Missing or failed lookups are left out
    /// and the view falls back to the raw id.
    async fn resolve<K, F, Fut>(&self, ids: Vec<K>, lookup: F) -> HashMap<K, Profile>
    where
        K: Copy + Eq + Hash + std::fmt::Display,
        F: Fn(K) -> Fut,
        Fut: Future<Output = Result<Option<Profile>>>,
    {
        let results = join_all(ids.iter().map(|&id| lookup(id))).await;

        ids.into_iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(profile) => profile.map(|p| (id, p)),
                Err(error) => {
                    tracing::warn!(%id, %error, "profile lookup failed");
                    None
                }
            })
            .collect()
    }
}

fn wrong_role(actor: &Actor, view: &str) -> QueryError {
    QueryError::Forbidden(format!(
        "{view} view requires role {view}, caller is {}",
        actor.role()
    ))
}

fn distinct<K: Copy + Eq + Hash>(orders: &[Order], key: impl Fn(&Order) -> K) -> Vec<K> {
    let mut seen = HashSet::new();
    orders
        .iter()
        .map(key)
        .filter(|id| seen.insert(*id))
        .collect()
}
