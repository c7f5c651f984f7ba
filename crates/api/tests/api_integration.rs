//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use fulfillment::LifecycleConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::Profile;
use serde_json::{Value, json};
use store::InMemoryMarketStore;
use tower::ServiceExt;
use uuid::Uuid;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// A caller as the authentication layer would present it.
#[derive(Clone, Copy)]
struct User {
    id: Uuid,
    role: &'static str,
}

impl User {
    fn customer() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: "customer",
        }
    }

    fn producer() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: "producer",
        }
    }
}

struct TestApp {
    app: axum::Router,
    state: Arc<AppState<InMemoryMarketStore>>,
}

impl TestApp {
    fn new() -> Self {
        let state =
            api::create_default_state(InMemoryMarketStore::new(), LifecycleConfig::default());
        let app = api::create_app(state.clone(), get_metrics_handle());
        Self { app, state }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder
                .header("x-user-id", user.id.to_string())
                .header("x-user-role", user.role);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn create_product(&self, producer: User, name: &str, price: &str, stock: u32) -> String {
        let (status, json) = self
            .send(
                "POST",
                "/products",
                Some(producer),
                Some(json!({
                    "name": name,
                    "price": price,
                    "stock": stock,
                    "unit": "piece",
                    "category": "produce"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product: {json}");
        json["id"].as_str().unwrap().to_string()
    }

    async fn add_to_cart(&self, customer: User, product_id: &str, quantity: u32) {
        let (status, json) = self
            .send(
                "POST",
                "/cart/lines",
                Some(customer),
                Some(json!({ "product_id": product_id, "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "add to cart: {json}");
    }

    async fn checkout(&self, customer: User) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/checkout",
            Some(customer),
            Some(json!({ "pickup_point": "Market hall", "pickup_date": "2024-06-01" })),
        )
        .await
    }

    async fn set_status(&self, user: User, order_id: &str, status: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            &format!("/orders/{order_id}/status"),
            Some(user),
            Some(json!({ "status": status })),
        )
        .await
    }

    async fn stock_of(&self, product_id: &str) -> u64 {
        let (_, json) = self
            .send("GET", &format!("/products/{product_id}"), None, None)
            .await;
        json["stock"].as_u64().unwrap()
    }

    async fn metrics_text(&self) -> String {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// One producer, one product with stock 10, one customer order of `quantity`.
    async fn single_order(&self, quantity: u32) -> (User, User, String, String) {
        let producer = User::producer();
        let customer = User::customer();
        let product_id = self.create_product(producer, "Honey", "9.00", 10).await;
        self.add_to_cart(customer, &product_id, quantity).await;

        let (status, json) = self.checkout(customer).await;
        assert_eq!(status, StatusCode::CREATED, "checkout: {json}");
        let order_id = json["orders"][0]["id"].as_str().unwrap().to_string();
        (customer, producer, product_id, order_id)
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, json) = app.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new();
    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_missing_identity_is_401() {
    let app = TestApp::new();
    let (status, json) = app.send("GET", "/cart", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn test_product_prices_are_decimal_strings() {
    let app = TestApp::new();
    let producer = User::producer();
    let product_id = app.create_product(producer, "Eggs", "3.5", 12).await;

    let (status, json) = app
        .send("GET", &format!("/products/{product_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["price_cents"], 350);
    assert_eq!(json["price"], "3.50");

    let (status, json) = app
        .send(
            "POST",
            "/products",
            Some(producer),
            Some(json!({
                "name": "Eggs",
                "price": "three",
                "stock": 1,
                "unit": "box",
                "category": "dairy"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "BadRequest");
}

#[tokio::test]
async fn test_customer_cannot_create_products() {
    let app = TestApp::new();
    let (status, json) = app
        .send(
            "POST",
            "/products",
            Some(User::customer()),
            Some(json!({
                "name": "Eggs",
                "price": "3.50",
                "stock": 1,
                "unit": "box",
                "category": "dairy"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "Forbidden");
}

#[tokio::test]
async fn test_archived_product_leaves_listing() {
    let app = TestApp::new();
    let producer = User::producer();
    let product_id = app.create_product(producer, "Figs", "7.00", 3).await;

    let (status, _) = app
        .send("DELETE", &format!("/products/{product_id}"), Some(producer), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app
        .send(
            "GET",
            &format!("/products?producer_id={}", producer.id),
            None,
            None,
        )
        .await;
    assert_eq!(json.as_array().unwrap().len(), 0);

    let (status, json) = app
        .send(
            "POST",
            "/cart/lines",
            Some(User::customer()),
            Some(json!({ "product_id": product_id, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "ProductUnavailable");
}

#[tokio::test]
async fn test_cart_lines_sum_and_zero_quantity_is_rejected() {
    let app = TestApp::new();
    let producer = User::producer();
    let customer = User::customer();
    let product_id = app.create_product(producer, "Pears", "2.90", 20).await;

    app.add_to_cart(customer, &product_id, 2).await;
    app.add_to_cart(customer, &product_id, 3).await;

    let (status, json) = app.send("GET", "/cart", Some(customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lines"].as_array().unwrap().len(), 1);
    assert_eq!(json["lines"][0]["quantity"], 5);

    let (status, json) = app
        .send(
            "POST",
            "/cart/lines",
            Some(customer),
            Some(json!({ "product_id": product_id, "quantity": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "InvalidQuantity");

    let (status, json) = app
        .send(
            "PUT",
            &format!("/cart/lines/{product_id}"),
            Some(customer),
            Some(json!({ "quantity": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["lines"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_merge_is_replay_safe() {
    let app = TestApp::new();
    let producer = User::producer();
    let customer = User::customer();
    let product_id = app.create_product(producer, "Plums", "3.10", 20).await;
    app.add_to_cart(customer, &product_id, 3).await;

    let body = json!({
        "session_id": Uuid::new_v4().to_string(),
        "lines": [
            { "product_id": product_id, "quantity": 2 },
            { "product_id": Uuid::new_v4().to_string(), "quantity": 1 }
        ]
    });

    let (status, json) = app
        .send("POST", "/cart/merge", Some(customer), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cart"]["lines"][0]["quantity"], 5);
    assert_eq!(json["merged"], 1);
    assert_eq!(json["dropped"].as_array().unwrap().len(), 1);
    assert_eq!(json["already_merged"], false);

    let (status, json) = app
        .send("POST", "/cart/merge", Some(customer), Some(body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["already_merged"], true);
    assert_eq!(json["cart"]["lines"][0]["quantity"], 5);
}

#[tokio::test]
async fn test_checkout_creates_one_order_per_producer() {
    let app = TestApp::new();
    let farm = User::producer();
    let dairy = User::producer();
    let customer = User::customer();

    let apples = app.create_product(farm, "Apples", "3.50", 10).await;
    let cheese = app.create_product(dairy, "Cheese", "5.00", 10).await;
    app.add_to_cart(customer, &apples, 2).await;
    app.add_to_cart(customer, &cheese, 1).await;

    let (status, json) = app.checkout(customer).await;

    assert_eq!(status, StatusCode::CREATED);
    let orders = json["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["producer_id"], farm.id.to_string());
    assert_eq!(orders[0]["total"], "7.00");
    assert_eq!(orders[0]["total_cents"], 700);
    assert_eq!(orders[0]["status"], "PENDING");
    assert_eq!(orders[0]["payment_status"], "pending");
    assert_eq!(orders[0]["pickup_date"], "2024-06-01");
    assert_eq!(orders[1]["producer_id"], dairy.id.to_string());
    assert_eq!(orders[1]["total"], "5.00");
    assert!(json["failures"].as_array().unwrap().is_empty());

    assert_eq!(app.stock_of(&apples).await, 8);
    let (_, cart) = app.send("GET", "/cart", Some(customer), None).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());

    let metrics = app.metrics_text().await;
    assert!(metrics.contains("checkout_requests_total"));
    assert!(metrics.contains("checkout_orders_created_total"));
}

#[tokio::test]
async fn test_empty_cart_checkout_is_400() {
    let app = TestApp::new();
    let (status, json) = app.checkout(User::customer()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "EmptyCartError");
}

#[tokio::test]
async fn test_checkout_with_every_group_failing_is_409() {
    let app = TestApp::new();
    let producer = User::producer();
    let customer = User::customer();
    let product_id = app.create_product(producer, "Bread", "3.00", 2).await;
    app.add_to_cart(customer, &product_id, 2).await;

    let (status, _) = app
        .send(
            "PUT",
            &format!("/products/{product_id}/stock"),
            Some(producer),
            Some(json!({ "stock": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app.checkout(customer).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["orders"].as_array().unwrap().is_empty());
    assert_eq!(json["failures"][0]["producer_id"], producer.id.to_string());
    assert_eq!(json["failures"][0]["error"], "InsufficientStockError");
    assert_eq!(app.stock_of(&product_id).await, 1);
}

#[tokio::test]
async fn test_status_machine_over_http() {
    let app = TestApp::new();
    let (_, producer, _, order_id) = app.single_order(1).await;

    let (status, json) = app.set_status(producer, &order_id, "PICKED_UP").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "InvalidTransitionError");

    for next in ["PREPARING", "READY", "PICKED_UP"] {
        let (status, json) = app.set_status(producer, &order_id, next).await;
        assert_eq!(status, StatusCode::OK, "{next}: {json}");
        assert_eq!(json["status"], next);
    }

    let (status, json) = app
        .send(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            Some(producer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "InvalidTransitionError");
}

#[tokio::test]
async fn test_customer_cancel_restores_stock() {
    let app = TestApp::new();
    let (customer, _, product_id, order_id) = app.single_order(2).await;
    assert_eq!(app.stock_of(&product_id).await, 8);

    let (status, json) = app
        .send(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            Some(customer),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "CANCELLED");
    assert_eq!(app.stock_of(&product_id).await, 10);
}

#[tokio::test]
async fn test_producer_cancel_with_explicit_restock() {
    let app = TestApp::new();
    let (_, producer, product_id, order_id) = app.single_order(4).await;

    let (status, _) = app
        .send(
            "POST",
            &format!("/orders/{order_id}/cancel?restock=true"),
            Some(producer),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stock_of(&product_id).await, 10);
}

#[tokio::test]
async fn test_customer_cannot_advance_status() {
    let app = TestApp::new();
    let (customer, _, _, order_id) = app.single_order(1).await;

    let (status, json) = app.set_status(customer, &order_id, "PREPARING").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "UnauthorizedTransitionError");
}

#[tokio::test]
async fn test_orders_are_hidden_from_strangers() {
    let app = TestApp::new();
    let (customer, producer, _, order_id) = app.single_order(1).await;
    let uri = format!("/orders/{order_id}");

    assert_eq!(app.send("GET", &uri, Some(customer), None).await.0, StatusCode::OK);
    assert_eq!(app.send("GET", &uri, Some(producer), None).await.0, StatusCode::OK);

    let (status, json) = app.send("GET", &uri, Some(User::customer()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "OrderNotFound");

    let (status, _) = app
        .send("GET", "/orders/not-a-uuid", Some(customer), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_declined_charge_can_be_retried() {
    let app = TestApp::new();
    let producer = User::producer();
    let customer = User::customer();
    let product_id = app.create_product(producer, "Cider", "8.00", 5).await;
    app.add_to_cart(customer, &product_id, 1).await;
    app.state.payments.set_decline(true).await;

    let (status, json) = app
        .send(
            "POST",
            "/checkout",
            Some(customer),
            Some(json!({
                "pickup_point": "Market hall",
                "payment": { "method": "charge", "payment_method_id": "pm_card" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["orders"][0]["payment_status"], "failed");
    let order_id = json["orders"][0]["id"].as_str().unwrap().to_string();

    app.state.payments.set_decline(false).await;
    let (status, json) = app
        .send(
            "POST",
            &format!("/orders/{order_id}/payment"),
            Some(customer),
            Some(json!({ "payment_method_id": "pm_card" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["payment_status"], "paid");

    let (status, json) = app
        .send(
            "POST",
            &format!("/orders/{order_id}/payment"),
            Some(customer),
            Some(json!({ "payment_method_id": "pm_card" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "PaymentNotRetryable");
}

#[tokio::test]
async fn test_fulfillment_views() {
    let app = TestApp::new();
    let (customer, producer, _, order_id) = app.single_order(2).await;

    app.state
        .directory
        .insert_producer(
            common::ProducerId::from_uuid(producer.id),
            Profile::named("Hillside Farm"),
        )
        .await;
    app.state
        .directory
        .insert_customer(
            common::CustomerId::from_uuid(customer.id),
            Profile::named("Ada").with_contact(Some("ada@example.com".to_string()), None),
        )
        .await;

    let (status, json) = app.send("GET", "/me/orders", Some(customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["order_id"], order_id);
    assert_eq!(json[0]["producer_name"], "Hillside Farm");
    assert_eq!(json[0]["total"], "18.00");
    assert_eq!(json[0]["pickup_date"], "2024-06-01");

    let (status, json) = app
        .send("GET", "/producer/orders", Some(producer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["customer_name"], "Ada");
    assert_eq!(json[0]["contact"]["email"], "ada@example.com");

    let (status, _) = app
        .send("GET", "/producer/orders", Some(customer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
