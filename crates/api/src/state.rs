//! Shared application state.

use std::sync::Arc;

use fulfillment::{
    CartService, CatalogService, InMemoryPaymentGateway, LifecycleConfig, OrderLifecycle,
    TracingNotifier,
};
use projections::{FulfillmentQueries, InMemoryDirectory};
use store::MarketStore;

/// Shared application state accessible from all handlers.
pub struct AppState<S: MarketStore> {
    pub catalog: CatalogService<S>,
    pub carts: CartService<S>,
    pub lifecycle: OrderLifecycle<S, InMemoryPaymentGateway, TracingNotifier>,
    pub queries: FulfillmentQueries<S, InMemoryDirectory>,
    pub payments: InMemoryPaymentGateway,
    pub directory: InMemoryDirectory,
}

/// Creates the default application state with in-process collaborators.
pub fn create_default_state<S: MarketStore + Clone + 'static>(
    store: S,
    config: LifecycleConfig,
) -> Arc<AppState<S>> {
    let payments = InMemoryPaymentGateway::new();
    let directory = InMemoryDirectory::new();

    Arc::new(AppState {
        catalog: CatalogService::new(store.clone()),
        carts: CartService::new(store.clone()),
        lifecycle: OrderLifecycle::new(store.clone(), payments.clone(), TracingNotifier, config),
        queries: FulfillmentQueries::new(store, directory.clone()),
        payments,
        directory,
    })
}
