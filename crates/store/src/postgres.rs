use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, Money, OrderId, ProducerId, ProductId, SessionId, Version};
use domain::{
    Cart, CartLine, Catalog, Order, OrderLine, OrderParts, OrderStatus, PaymentStatus,
    PaymentUpdate, PickupSelection, Product, TransitionPlan,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{Result, StoreError, store::MarketStore};

const PRODUCT_COLUMNS: &str =
    "id, producer_id, name, price_cents, stock, unit, category, available";

const ORDER_COLUMNS: &str = "id, customer_id, producer_id, total_cents, status, payment_status, \
     pickup_point, pickup_date, payment_method_id, payment_intent_id, created_at, updated_at";

/// Which orders a listing query selects.
enum OrderFilter {
    Id(OrderId),
    Customer(CustomerId),
    Producer(ProducerId),
}

impl OrderFilter {
    fn clause(&self) -> &'static str {
        match self {
            OrderFilter::Id(_) => "id = $1",
            OrderFilter::Customer(_) => "customer_id = $1",
            OrderFilter::Producer(_) => "producer_id = $1",
        }
    }

    fn uuid(&self) -> Uuid {
        match self {
            OrderFilter::Id(id) => id.as_uuid(),
            OrderFilter::Customer(id) => id.as_uuid(),
            OrderFilter::Producer(id) => id.as_uuid(),
        }
    }
}

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresMarketStore {
    pool: PgPool,
}

impl PostgresMarketStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            producer_id: ProducerId::from_uuid(row.try_get::<Uuid, _>("producer_id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: to_u32(row.try_get("stock")?, "stock")?,
            unit: row.try_get("unit")?,
            category: row.try_get("category")?,
            available: row.try_get("available")?,
        })
    }

    fn row_to_order_line(row: &PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: to_u32(row.try_get("quantity")?, "quantity")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;

        let parts = OrderParts {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            producer_id: ProducerId::from_uuid(row.try_get::<Uuid, _>("producer_id")?),
            lines,
            total: Money::from_cents(row.try_get("total_cents")?),
            status: status.parse::<OrderStatus>().map_err(StoreError::Decode)?,
            payment_status: payment_status
                .parse::<PaymentStatus>()
                .map_err(StoreError::Decode)?,
            pickup: PickupSelection::new(
                row.try_get::<String, _>("pickup_point")?,
                row.try_get::<Option<NaiveDate>, _>("pickup_date")?,
            ),
            payment_method_id: row.try_get("payment_method_id")?,
            payment_intent_id: row.try_get("payment_intent_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        };

        Order::restore(parts).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn fetch_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {} ORDER BY created_at DESC, id ASC",
            filter.clause()
        );
        let rows = sqlx::query(&sql)
            .bind(filter.uuid())
            .fetch_all(&self.pool)
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let line_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price_cents
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in &line_rows {
            lines
                .entry(row.try_get("order_id")?)
                .or_default()
                .push(Self::row_to_order_line(row)?);
        }

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id")?;
                Self::row_to_order(row, lines.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Order> {
        self.fetch_orders(OrderFilter::Id(order_id))
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::OrderNotFound(order_id))
    }
}

fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Decode(format!("{field} out of range: {value}")))
}

#[async_trait]
impl MarketStore for PostgresMarketStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, producer_id, name, price_cents, stock, unit, category, available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.producer_id.as_uuid())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .bind(&product.unit)
        .bind(&product.category)
        .bind(product.available)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("products_pkey")
            {
                return StoreError::DuplicateProduct(product.id);
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, price_cents = $3, stock = $4, unit = $5, category = $6, available = $7
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .bind(&product.unit)
        .bind(&product.category)
        .bind(product.available)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(product.id));
        }
        Ok(())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(product_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn get_products(&self, product_ids: &[ProductId]) -> Result<Catalog> {
        let ids: Vec<Uuid> = product_ids.iter().map(ProductId::as_uuid).collect();
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
        let rows = sqlx::query(&sql).bind(&ids).fetch_all(&self.pool).await?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn list_products(&self, producer_id: Option<ProducerId>) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::uuid IS NULL OR producer_id = $1) ORDER BY name ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(producer_id.map(|id| id.as_uuid()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn load_cart(&self, customer_id: CustomerId) -> Result<Cart> {
        // One statement so the version and the lines come from the same snapshot.
        let rows = sqlx::query(
            r#"
            SELECT c.version, l.product_id, l.quantity
            FROM carts c
            LEFT JOIN cart_lines l ON l.customer_id = c.customer_id
            WHERE c.customer_id = $1
            ORDER BY l.position ASC
            "#,
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let Some(first) = rows.first() else {
            return Ok(Cart::new());
        };
        let version = Version::new(first.try_get("version")?);

        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(product_id) = row.try_get::<Option<Uuid>, _>("product_id")? else {
                continue;
            };
            lines.push(CartLine {
                product_id: ProductId::from_uuid(product_id),
                quantity: to_u32(row.try_get("quantity")?, "quantity")?,
            });
        }

        Cart::restore(lines, version).map_err(|e| StoreError::Decode(e.to_string()))
    }

    #[tracing::instrument(skip(self, cart), fields(expected_version = %cart.version()))]
    async fn save_cart(
        &self,
        customer_id: CustomerId,
        cart: &Cart,
        merged_session: Option<SessionId>,
    ) -> Result<Version> {
        let expected = cart.version();
        let next = expected.next();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let written = if expected == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO carts (customer_id, version, updated_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (customer_id) DO NOTHING
                "#,
            )
            .bind(customer_id.as_uuid())
            .bind(next.as_i64())
            .bind(now)
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query(
                "UPDATE carts SET version = $2, updated_at = $3 WHERE customer_id = $1 AND version = $4",
            )
            .bind(customer_id.as_uuid())
            .bind(next.as_i64())
            .bind(now)
            .bind(expected.as_i64())
            .execute(&mut *tx)
            .await?
        };

        if written.rows_affected() == 0 {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM carts WHERE customer_id = $1")
                    .bind(customer_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(StoreError::ConcurrencyConflict {
                customer_id,
                expected,
                actual: Version::new(actual.unwrap_or(0)),
            });
        }

        if let Some(session_id) = merged_session {
            let recorded = sqlx::query(
                r#"
                INSERT INTO merged_sessions (customer_id, session_id, merged_at)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(customer_id.as_uuid())
            .bind(session_id.as_uuid())
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if recorded.rows_affected() == 0 {
                return Err(StoreError::SessionAlreadyMerged(session_id));
            }
        }

        sqlx::query("DELETE FROM cart_lines WHERE customer_id = $1")
            .bind(customer_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        for (position, line) in cart.lines().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_lines (customer_id, product_id, quantity, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(customer_id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(i64::from(line.quantity))
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(next)
    }

    async fn is_session_merged(
        &self,
        customer_id: CustomerId,
        session_id: SessionId,
    ) -> Result<bool> {
        let found: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM merged_sessions WHERE customer_id = $1 AND session_id = $2",
        )
        .bind(customer_id.as_uuid())
        .bind(session_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id(), producer_id = %order.producer_id()))]
    async fn commit_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Lock products in id order.
        let mut lines: Vec<&OrderLine> = order.lines().iter().collect();
        lines.sort_by_key(|line| line.product_id);

        for line in lines {
            let decremented = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - $1
                WHERE id = $2 AND available AND stock >= $1
                "#,
            )
            .bind(i64::from(line.quantity))
            .bind(line.product_id.as_uuid())
            .execute(&mut *tx)
            .await?;

            if decremented.rows_affected() == 0 {
                let current: Option<(i64, bool)> =
                    sqlx::query_as("SELECT stock, available FROM products WHERE id = $1")
                        .bind(line.product_id.as_uuid())
                        .fetch_optional(&mut *tx)
                        .await?;
                let available = match current {
                    Some((stock, true)) => u32::try_from(stock).unwrap_or(u32::MAX),
                    _ => 0,
                };
                tracing::debug!(product_id = %line.product_id, available, "stock decrement refused");
                // Dropping the transaction rolls back earlier decrements.
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available,
                });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, producer_id, total_cents, status, payment_status,
                                pickup_point, pickup_date, payment_method_id, payment_intent_id,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.customer_id().as_uuid())
        .bind(order.producer_id().as_uuid())
        .bind(order.total().cents())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(&order.pickup().pickup_point)
        .bind(order.pickup().pickup_date)
        .bind(order.payment_method_id())
        .bind(order.payment_intent_id())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await?;

        for (position, line) in order.lines().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, position, product_id, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(position as i32)
            .bind(line.product_id.as_uuid())
            .bind(&line.product_name)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(order_id = %plan.order_id))]
    async fn transition_order(&self, plan: &TransitionPlan, at: DateTime<Utc>) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1 AND status = $4",
        )
        .bind(plan.order_id.as_uuid())
        .bind(plan.to.as_str())
        .bind(at)
        .bind(plan.from.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let actual: Option<String> =
                sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                    .bind(plan.order_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
            return match actual {
                None => Err(StoreError::OrderNotFound(plan.order_id)),
                Some(actual) => Err(StoreError::StatusConflict {
                    order_id: plan.order_id,
                    expected: plan.from,
                    actual: actual.parse().map_err(StoreError::Decode)?,
                }),
            };
        }

        if plan.restock {
            sqlx::query(
                r#"
                UPDATE products AS p
                SET stock = LEAST(p.stock + ol.quantity, $2)
                FROM order_lines ol
                WHERE ol.order_id = $1 AND ol.product_id = p.id
                "#,
            )
            .bind(plan.order_id.as_uuid())
            .bind(i64::from(u32::MAX))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.fetch_order(plan.order_id).await
    }

    async fn set_payment(
        &self,
        order_id: OrderId,
        update: &PaymentUpdate,
        at: DateTime<Utc>,
    ) -> Result<Order> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = $2,
                payment_intent_id = COALESCE($3, payment_intent_id),
                payment_method_id = COALESCE($4, payment_method_id),
                updated_at = $5
            WHERE id = $1 AND status <> $6
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(update.status.as_str())
        .bind(update.payment_intent_id.as_deref())
        .bind(update.payment_method_id.as_deref())
        .bind(at)
        .bind(OrderStatus::Cancelled.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<String> =
                sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
                    .bind(order_id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;
            return Err(match exists {
                Some(_) => StoreError::OrderCancelled(order_id),
                None => StoreError::OrderNotFound(order_id),
            });
        }
        self.fetch_order(order_id).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self
            .fetch_orders(OrderFilter::Id(order_id))
            .await?
            .into_iter()
            .next())
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        self.fetch_orders(OrderFilter::Customer(customer_id)).await
    }

    async fn orders_for_producer(&self, producer_id: ProducerId) -> Result<Vec<Order>> {
        self.fetch_orders(OrderFilter::Producer(producer_id)).await
    }
}
