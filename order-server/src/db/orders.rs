//! PostgreSQL order store
//!
//! One aggregate spans four tables (orders, delivery, payment, items);
//! saves are transactional so an order is either fully durable or absent.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{OrderStore, SaveOutcome};
use crate::error::ServiceError;
use crate::model::{
    DeliveryResponse, ItemResponse, Order, OrderPreview, OrderResponse, PaymentResponse,
};

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FullOrderRow {
    order_uid: String,
    track_number: String,
    customer_id: String,
    date_created: DateTime<Utc>,
    name: String,
    phone: String,
    city: String,
    address: String,
    email: String,
    transaction: String,
    currency: String,
    amount: i64,
}

type ItemRow = (String, i64, String, String, i32);

/// Group item rows by order identifier, preserving row order.
fn group_items(rows: Vec<ItemRow>) -> HashMap<String, Vec<ItemResponse>> {
    let mut by_order: HashMap<String, Vec<ItemResponse>> = HashMap::new();
    for (order_uid, price, name, brand, status) in rows {
        by_order.entry(order_uid).or_default().push(ItemResponse {
            name,
            price,
            brand,
            status,
        });
    }
    by_order
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn save(&self, order: &Order) -> Result<SaveOutcome, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (
                order_uid, track_number, entry, locale, internal_signature,
                customer_id, delivery_service, shardkey, sm_id, date_created,
                oof_shard, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (order_uid) DO NOTHING
            "#,
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shard_key)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            // redelivered message; the aggregate is already durable
            tx.rollback().await?;
            tracing::debug!(order_uid = %order.order_uid, "duplicate order skipped");
            return Ok(SaveOutcome::Duplicate);
        }

        sqlx::query(
            r#"
            INSERT INTO delivery (
                order_uid, name, phone, zip, city, address, region, email
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&order.delivery.name)
        .bind(&order.delivery.phone)
        .bind(&order.delivery.zip)
        .bind(&order.delivery.city)
        .bind(&order.delivery.address)
        .bind(&order.delivery.region)
        .bind(&order.delivery.email)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO payment (
                order_uid, transaction, request_id, currency, provider, amount,
                payment_dt, bank, delivery_cost, goods_total, custom_fee
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&order.payment.transaction)
        .bind(&order.payment.request_id)
        .bind(&order.payment.currency)
        .bind(&order.payment.provider)
        .bind(order.payment.amount)
        .bind(order.payment.payment_dt)
        .bind(&order.payment.bank)
        .bind(order.payment.delivery_cost)
        .bind(order.payment.goods_total)
        .bind(order.payment.custom_fee)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO items (
                    order_uid, chrt_id, track_number, price, rid, name, sale,
                    size, total_price, nm_id, brand, status
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(&order.order_uid)
            .bind(item.chrt_id)
            .bind(&item.track_number)
            .bind(item.price)
            .bind(&item.rid)
            .bind(&item.name)
            .bind(item.sale)
            .bind(&item.size)
            .bind(item.total_price)
            .bind(item.nm_id)
            .bind(&item.brand)
            .bind(item.status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(SaveOutcome::Saved)
    }

    async fn get_by_id(&self, id: &str) -> Result<OrderResponse, ServiceError> {
        let header: Option<(String, String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT order_uid, track_number, customer_id, date_created \
             FROM orders WHERE order_uid = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((order_uid, track_number, customer_id, date_created)) = header else {
            return Err(ServiceError::NotFound);
        };

        let delivery: Option<(String, String, String, String, String)> = sqlx::query_as(
            "SELECT name, phone, city, address, email FROM delivery WHERE order_uid = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some((name, phone, city, address, email)) = delivery else {
            return Err(ServiceError::NotFound);
        };

        let payment: Option<(String, String, i64)> = sqlx::query_as(
            "SELECT transaction, currency, amount FROM payment WHERE order_uid = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let Some((transaction, currency, amount)) = payment else {
            return Err(ServiceError::NotFound);
        };

        let item_rows: Vec<(i64, String, String, i32)> =
            sqlx::query_as("SELECT price, name, brand, status FROM items WHERE order_uid = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
        if item_rows.is_empty() {
            return Err(ServiceError::NotFound);
        }

        Ok(OrderResponse {
            order_uid,
            track_number,
            customer_id,
            date_created,
            delivery: DeliveryResponse {
                name,
                phone,
                city,
                address,
                email,
            },
            payment: PaymentResponse {
                transaction,
                currency,
                amount,
            },
            items: item_rows
                .into_iter()
                .map(|(price, name, brand, status)| ItemResponse {
                    name,
                    price,
                    brand,
                    status,
                })
                .collect(),
        })
    }

    async fn list_previews(&self) -> Result<Vec<OrderPreview>, ServiceError> {
        let previews: Vec<OrderPreview> = sqlx::query_as(
            "SELECT order_uid, track_number, customer_id, date_created \
             FROM orders ORDER BY date_created DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        if previews.is_empty() {
            return Err(ServiceError::NotFound);
        }
        Ok(previews)
    }

    async fn fetch_full(&self, limit: i64) -> Result<Vec<OrderResponse>, ServiceError> {
        let rows: Vec<FullOrderRow> = sqlx::query_as(
            r#"
            SELECT
                o.order_uid, o.track_number, o.customer_id, o.date_created,
                d.name, d.phone, d.city, d.address, d.email,
                p.transaction, p.currency, p.amount
            FROM orders o
            JOIN delivery d ON d.order_uid = o.order_uid
            JOIN payment p ON p.order_uid = o.order_uid
            ORDER BY o.date_created DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let uids: Vec<String> = rows.iter().map(|row| row.order_uid.clone()).collect();
        let item_rows: Vec<ItemRow> = sqlx::query_as(
            "SELECT order_uid, price, name, brand, status FROM items WHERE order_uid = ANY($1)",
        )
        .bind(&uids)
        .fetch_all(&self.pool)
        .await?;
        let mut items = group_items(item_rows);

        Ok(rows
            .into_iter()
            .map(|row| OrderResponse {
                items: items.remove(&row.order_uid).unwrap_or_default(),
                order_uid: row.order_uid,
                track_number: row.track_number,
                customer_id: row.customer_id,
                date_created: row.date_created,
                delivery: DeliveryResponse {
                    name: row.name,
                    phone: row.phone,
                    city: row.city,
                    address: row.address,
                    email: row.email,
                },
                payment: PaymentResponse {
                    transaction: row.transaction,
                    currency: row.currency,
                    amount: row.amount,
                },
            })
            .collect())
    }
}
