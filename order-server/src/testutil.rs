//! Test doubles and fixtures shared across module tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::db::{OrderStore, SaveOutcome};
use crate::error::ServiceError;
use crate::model::{Delivery, Item, Order, OrderPreview, OrderResponse, Payment};

/// In-memory store with call counters and one-shot failure injection.
#[derive(Default)]
pub struct MockStore {
    orders: Mutex<HashMap<String, OrderResponse>>,
    saves: AtomicUsize,
    gets: AtomicUsize,
    lists: AtomicUsize,
    fail: AtomicBool,
}

impl MockStore {
    /// Seed a read view without touching the call counters.
    pub fn insert_order(&self, order: OrderResponse) {
        self.orders
            .lock()
            .unwrap()
            .insert(order.order_uid.clone(), order);
    }

    /// Make the next store call fail with a persistence error.
    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn take_failure(&self) -> Result<(), ServiceError> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::Persistence("store offline".into()));
        }
        Ok(())
    }

    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for MockStore {
    async fn save(&self, order: &Order) -> Result<SaveOutcome, ServiceError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let mut orders = self.orders.lock().unwrap();
        if orders.contains_key(&order.order_uid) {
            return Ok(SaveOutcome::Duplicate);
        }
        orders.insert(order.order_uid.clone(), order.to_response());
        Ok(SaveOutcome::Saved)
    }

    async fn get_by_id(&self, id: &str) -> Result<OrderResponse, ServiceError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        self.orders
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn list_previews(&self) -> Result<Vec<OrderPreview>, ServiceError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let orders = self.orders.lock().unwrap();
        if orders.is_empty() {
            return Err(ServiceError::NotFound);
        }
        let mut previews: Vec<OrderPreview> = orders
            .values()
            .map(|order| OrderPreview {
                order_uid: order.order_uid.clone(),
                track_number: order.track_number.clone(),
                customer_id: order.customer_id.clone(),
                date_created: order.date_created,
            })
            .collect();
        previews.sort_by(|a, b| b.date_created.cmp(&a.date_created));
        Ok(previews)
    }

    async fn fetch_full(&self, limit: i64) -> Result<Vec<OrderResponse>, ServiceError> {
        self.take_failure()?;
        let orders = self.orders.lock().unwrap();
        Ok(orders.values().take(limit as usize).cloned().collect())
    }
}

/// A fully valid order aggregate with the given identifier.
pub fn sample_order(id: &str) -> Order {
    Order {
        order_uid: id.to_string(),
        track_number: "WBILMTESTTRACK".into(),
        entry: "WBIL".into(),
        locale: "en".into(),
        internal_signature: String::new(),
        customer_id: "cust-1".into(),
        delivery_service: "meest".into(),
        shard_key: "9".into(),
        sm_id: 99,
        date_created: Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).unwrap(),
        oof_shard: "1".into(),
        created_at: Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 20).unwrap(),
        delivery: Delivery {
            name: "Test Testov".into(),
            phone: "+9720000000".into(),
            zip: "2639809".into(),
            city: "Kiryat Mozkin".into(),
            address: "Ploshad Mira 15".into(),
            region: "Kraiot".into(),
            email: "test@gmail.com".into(),
        },
        payment: Payment {
            transaction: format!("txn-{id}"),
            request_id: String::new(),
            currency: "USD".into(),
            provider: "wbpay".into(),
            amount: 100,
            payment_dt: 1_637_907_727,
            bank: "alpha".into(),
            delivery_cost: 50,
            goods_total: 50,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9_934_930,
            track_number: "WBILMTESTTRACK".into(),
            price: 50,
            rid: "ab4219087a764ae0btest".into(),
            name: "Mascaras".into(),
            sale: 0,
            size: "0".into(),
            total_price: 50,
            nm_id: 2_389_212,
            brand: "Vivienne Sabo".into(),
            status: 202,
        }],
    }
}
