use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CatalogStore, LineRequest, Money, Order, OrderId, OrderItem, OrderQuery, OrderStatus, Page,
    PlaceOrder, Product, ProductId, ProductUpdate, Result, Review, ReviewId, ReviewQuery,
    SortDirection, SortField, SortKey, StoreError, UserId,
};

const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, category, stock, rating, \
                               num_reviews, is_active, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, total_price_cents, status, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, user_id, product_id, rating, comment, created_at";

/// PostgreSQL-backed catalog store.
///
/// Stock never goes negative: every line of an order is a conditional
/// decrement inside one transaction, and the schema carries a
/// `CHECK (stock >= 0)` constraint as a backstop.
#[derive(Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Creates a new PostgreSQL catalog store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            category: row.try_get("category")?,
            stock: to_u32(row.try_get("stock")?, "products.stock")?,
            rating: row.try_get("rating")?,
            num_reviews: to_u32(row.try_get("num_reviews")?, "products.num_reviews")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            items,
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            status,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: to_u32(row.try_get("quantity")?, "order_items.quantity")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_review(row: PgRow) -> Result<Review> {
        let rating: i16 = row.try_get("rating")?;
        let rating = u8::try_from(rating)
            .map_err(|_| StoreError::Corrupt(format!("reviews.rating out of range: {rating}")))?;

        Ok(Review {
            id: ReviewId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            rating,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
        })
    }

    /// Loads the items of the given orders, keyed by order and in line order.
    async fn load_items(
        conn: &mut PgConnection,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<OrderItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(order_ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in &rows {
            let order_id: Uuid = row.try_get("order_id")?;
            items
                .entry(order_id)
                .or_default()
                .push(Self::row_to_item(row)?);
        }
        Ok(items)
    }

    /// Works out why a line's conditional decrement matched no row.
    async fn reject_line(conn: &mut PgConnection, line: &LineRequest) -> Result<StoreError> {
        let current = sqlx::query("SELECT name, stock, is_active FROM products WHERE id = $1")
            .bind(line.product_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;

        tracing::debug!(product_id = %line.product_id, requested = line.quantity, "order line rejected");

        match current {
            Some(row) if row.try_get::<bool, _>("is_active")? => {
                Ok(StoreError::InsufficientStock {
                    product_id: line.product_id,
                    product_name: row.try_get("name")?,
                    available: to_u32(row.try_get("stock")?, "products.stock")?,
                    requested: line.quantity,
                })
            }
            _ => Ok(StoreError::ProductNotFound(line.product_id)),
        }
    }

    /// Recomputes a product's rating aggregate from its reviews.
    async fn recompute_rating(
        conn: &mut PgConnection,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE products SET
                rating = COALESCE(
                    (SELECT AVG(rating)::DOUBLE PRECISION FROM reviews WHERE product_id = $1), 0),
                num_reviews = (SELECT COUNT(*) FROM reviews WHERE product_id = $1)::INTEGER,
                updated_at = $2
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product_id.as_uuid())
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StoreError::ProductNotFound(product_id))?;

        Self::row_to_product(row)
    }

    /// Takes the row lock on a product, returning false if it does not exist.
    async fn lock_product(conn: &mut PgConnection, product_id: ProductId) -> Result<bool> {
        let locked = sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(locked.is_some())
    }
}

fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} is negative: {value}")))
}

fn to_i32(value: u32, column: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} too large: {value}")))
}

fn order_by<F: SortField>(sort: &[SortKey<F>]) -> String {
    let mut clause: Vec<String> = sort
        .iter()
        .map(|key| {
            let direction = match key.direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            format!("{} {direction}", key.field.column())
        })
        .collect();
    clause.push("id ASC".to_string());
    clause.join(", ")
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn insert_product(&self, product: Product) -> Result<Product> {
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(&product.category)
        .bind(to_i32(product.stock, "products.stock")?)
        .bind(product.rating)
        .bind(to_i32(product.num_reviews, "products.num_reviews")?)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        update: ProductUpdate,
        now: DateTime<Utc>,
    ) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::ProductNotFound(product_id))?;

        let mut product = Self::row_to_product(row)?;
        update.apply_to(&mut product, now);

        sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price_cents = $4, category = $5,
                stock = $6, is_active = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(&product.category)
        .bind(to_i32(product.stock, "products.stock")?)
        .bind(product.is_active)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(product)
    }

    async fn place_order(&self, order: PlaceOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        // Lock every touched product up front, in a fixed order, so two
        // checkouts over overlapping products cannot deadlock.
        let mut product_ids: Vec<Uuid> = order
            .lines
            .iter()
            .map(|line| line.product_id.as_uuid())
            .collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        sqlx::query("SELECT id FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&product_ids)
            .fetch_all(&mut *tx)
            .await?;

        let mut items = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let Ok(requested) = i32::try_from(line.quantity) else {
                return Err(Self::reject_line(&mut *tx, line).await?);
            };

            let decremented = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - $2, updated_at = $3
                WHERE id = $1 AND is_active AND stock >= $2
                RETURNING name, price_cents
                "#,
            )
            .bind(line.product_id.as_uuid())
            .bind(requested)
            .bind(order.placed_at)
            .fetch_optional(&mut *tx)
            .await?;

            // Returning here drops the transaction, rolling back earlier lines.
            let Some(row) = decremented else {
                return Err(Self::reject_line(&mut *tx, line).await?);
            };

            items.push(OrderItem {
                product_id: line.product_id,
                product_name: row.try_get("name")?,
                quantity: line.quantity,
                unit_price: Money::from_cents(row.try_get("price_cents")?),
            });
        }

        let persisted = Order::from_lines(
            order.order_id,
            order.user_id,
            items,
            order.status,
            order.placed_at,
        )?;

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(persisted.id.as_uuid())
        .bind(persisted.user_id.as_uuid())
        .bind(persisted.total_price.cents())
        .bind(persisted.status.as_str())
        .bind(persisted.created_at)
        .bind(persisted.updated_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in persisted.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items
                    (order_id, position, product_id, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(persisted.id.as_uuid())
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(item.product_id.as_uuid())
            .bind(&item.product_name)
            .bind(to_i32(item.quantity, "order_items.quantity")?)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(persisted)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut items = Self::load_items(&mut *conn, &[order_id.as_uuid()]).await?;
        let items = items.remove(&order_id.as_uuid()).unwrap_or_default();
        Self::row_to_order(&row, items).map(Some)
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        let mut filter = String::from(" WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.user_id.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND status = ${param_count}"));
        }

        let count_sql = format!("SELECT COUNT(*) FROM orders{filter}");
        let list_sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders{filter} ORDER BY {} LIMIT ${} OFFSET ${}",
            order_by(&query.sort),
            param_count + 1,
            param_count + 2,
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut list_query = sqlx::query(&list_sql);
        if let Some(user_id) = query.user_id {
            count_query = count_query.bind(user_id.as_uuid());
            list_query = list_query.bind(user_id.as_uuid());
        }
        if let Some(status) = query.status {
            count_query = count_query.bind(status.as_str());
            list_query = list_query.bind(status.as_str());
        }
        list_query = list_query
            .bind(i64::from(query.pagination.limit))
            .bind(to_i64(query.pagination.offset()));

        let mut conn = self.pool.acquire().await?;
        let total = count_query.fetch_one(&mut *conn).await?;
        let rows = list_query.fetch_all(&mut *conn).await?;

        let order_ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut items = Self::load_items(&mut *conn, &order_ids).await?;

        let orders = rows
            .iter()
            .zip(&order_ids)
            .map(|(row, id)| Self::row_to_order(row, items.remove(id).unwrap_or_default()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(
            orders,
            query.pagination,
            u64::try_from(total).unwrap_or(0),
        ))
    }

    async fn set_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id.as_uuid())
        .bind(status.as_str())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::OrderNotFound(order_id))?;

        let mut items = Self::load_items(&mut *tx, &[order_id.as_uuid()]).await?;
        let order = Self::row_to_order(&row, items.remove(&order_id.as_uuid()).unwrap_or_default())?;

        tx.commit().await?;
        Ok(order)
    }

    async fn insert_review(&self, review: Review) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        if !Self::lock_product(&mut *tx, review.product_id).await? {
            return Err(StoreError::ProductNotFound(review.product_id));
        }

        sqlx::query(&format!(
            "INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(review.id.as_uuid())
        .bind(review.user_id.as_uuid())
        .bind(review.product_id.as_uuid())
        .bind(i16::from(review.rating))
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("reviews_user_product_unique")
            {
                return StoreError::DuplicateReview {
                    user_id: review.user_id,
                    product_id: review.product_id,
                };
            }
            StoreError::Database(e)
        })?;

        let product = Self::recompute_rating(&mut *tx, review.product_id, review.created_at).await?;

        tx.commit().await?;
        Ok(product)
    }

    async fn get_review(&self, review_id: ReviewId) -> Result<Option<Review>> {
        let row = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(review_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_review).transpose()
    }

    async fn delete_review(&self, review_id: ReviewId) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        let product_id: Uuid = sqlx::query_scalar("SELECT product_id FROM reviews WHERE id = $1")
            .bind(review_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::ReviewNotFound(review_id))?;
        let product_id = ProductId::from_uuid(product_id);

        // Same lock as insert_review, so the recompute sees every committed review.
        Self::lock_product(&mut *tx, product_id).await?;

        let deleted = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::ReviewNotFound(review_id));
        }

        let product = Self::recompute_rating(&mut *tx, product_id, Utc::now()).await?;

        tx.commit().await?;
        Ok(product)
    }

    async fn list_reviews(&self, query: &ReviewQuery) -> Result<Page<Review>> {
        let mut filter = String::from(" WHERE product_id = $1");
        let mut param_count = 1;

        if query.min_rating.is_some() {
            param_count += 1;
            filter.push_str(&format!(" AND rating >= ${param_count}"));
        }

        let count_sql = format!("SELECT COUNT(*) FROM reviews{filter}");
        let list_sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews{filter} ORDER BY {} LIMIT ${} OFFSET ${}",
            order_by(&query.sort),
            param_count + 1,
            param_count + 2,
        );

        let mut count_query =
            sqlx::query_scalar::<_, i64>(&count_sql).bind(query.product_id.as_uuid());
        let mut list_query = sqlx::query(&list_sql).bind(query.product_id.as_uuid());
        if let Some(min_rating) = query.min_rating {
            count_query = count_query.bind(i16::from(min_rating));
            list_query = list_query.bind(i16::from(min_rating));
        }
        list_query = list_query
            .bind(i64::from(query.pagination.limit))
            .bind(to_i64(query.pagination.offset()));

        let total = count_query.fetch_one(&self.pool).await?;
        let reviews = list_query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Self::row_to_review)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(
            reviews,
            query.pagination,
            u64::try_from(total).unwrap_or(0),
        ))
    }
}
