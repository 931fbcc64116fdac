//! Order feed emulator
//!
//! Stands in for an external producer during local runs: takes a fixed base
//! order, randomizes the identifying fields and amounts, and publishes the
//! serialized records onto the feed channel.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::InboundMessage;
use crate::model::{Delivery, Item, Order, Payment};

pub struct EmulatorOptions {
    pub count: usize,
    pub delay: Duration,
}

pub async fn run(
    tx: mpsc::Sender<InboundMessage>,
    opts: EmulatorOptions,
    shutdown: CancellationToken,
) {
    tracing::info!(count = opts.count, "order feed emulator started");
    let mut rng = StdRng::from_entropy();
    let base = base_order();

    for i in 0..opts.count {
        if shutdown.is_cancelled() {
            break;
        }

        let order = randomize_order(&base, &mut rng, i);
        let payload = match serde_json::to_vec(&order) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize emulated order");
                continue;
            }
        };

        let msg = InboundMessage {
            key: order.order_uid.clone(),
            payload,
            offset: i as u64,
            ack: None,
        };
        if tx.send(msg).await.is_err() {
            tracing::warn!("order feed closed, emulator stopping");
            break;
        }

        if !opts.delay.is_zero() && i < opts.count - 1 {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(opts.delay) => {}
            }
        }
    }

    tracing::info!("order feed emulator finished");
}

fn randomize_order(base: &Order, rng: &mut StdRng, i: usize) -> Order {
    let mut order = base.clone();
    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    order.order_uid = format!("{}-{i}-{stamp}", base.order_uid);
    order.track_number = rand_alphanum(rng, 12);
    order.customer_id = format!("cust-{}", rng.gen_range(0..100_000));
    order.date_created = base.date_created + chrono::Duration::seconds(i as i64);
    order.created_at = Utc::now();
    order.delivery.name = format!("Test User {}", rng.gen_range(0..1000));
    order.delivery.phone = format!("+{}", rng.gen_range(100_000_000..1_000_000_000));
    order.delivery.email = format!("user{}@example.com", rng.gen_range(0..100_000));
    order.payment.transaction = format!("{}-{i}-{stamp}", base.payment.transaction);
    order.payment.amount = rng.gen_range(100..5100);
    order.payment.delivery_cost = rng.gen_range(50..550);
    order.payment.goods_total = rng.gen_range(50..4050);

    if let Some(item) = order.items.first_mut() {
        item.chrt_id += i as i64;
        item.price = rng.gen_range(100..1100);
        item.total_price = (item.price - i64::from(item.sale)).max(1);
        item.track_number = order.track_number.clone();
        item.rid = format!("rid-{}", rand_alphanum(rng, 8));
        item.name = format!("Item-{}", rng.gen_range(0..1000));
        item.brand = ["Vivienne Sabo", "Acme", "Umbrella", "Globex"][rng.gen_range(0..4)].into();
    }

    order
}

fn rand_alphanum(rng: &mut StdRng, n: usize) -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    (0..n)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

fn base_order() -> Order {
    Order {
        order_uid: "b563feb7b2b84b6test".into(),
        track_number: "WBILMTESTTRACK".into(),
        entry: "WBIL".into(),
        locale: "en".into(),
        internal_signature: String::new(),
        customer_id: "test".into(),
        delivery_service: "meest".into(),
        shard_key: "9".into(),
        sm_id: 99,
        // 2021-11-26T06:22:19Z
        date_created: DateTime::from_timestamp(1_637_907_739, 0).unwrap_or_default(),
        oof_shard: "1".into(),
        created_at: Utc::now(),
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
            transaction: "b563feb7b2b84b6test".into(),
            request_id: String::new(),
            currency: "USD".into(),
            provider: "wbpay".into(),
            amount: 1817,
            payment_dt: 1_637_907_727,
            bank: "alpha".into(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9_934_930,
            track_number: "WBILMTESTTRACK".into(),
            price: 453,
            rid: "ab4219087a764ae0btest".into(),
            name: "Mascaras".into(),
            sale: 30,
            size: "0".into(),
            total_price: 317,
            nm_id: 2_389_212,
            brand: "Vivienne Sabo".into(),
            status: 202,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[tokio::test]
    async fn emulated_records_decode_and_validate() {
        let (tx, mut rx) = mpsc::channel(16);
        let opts = EmulatorOptions {
            count: 3,
            delay: Duration::ZERO,
        };

        run(tx, opts, CancellationToken::new()).await;

        let base_created = DateTime::from_timestamp(1_637_907_739, 0).unwrap_or_default();
        let mut seen = Vec::new();
        while let Some(msg) = rx.recv().await {
            let order: Order = serde_json::from_slice(&msg.payload).unwrap();
            assert!(order.validate().is_ok(), "emulated order must be valid");
            assert_eq!(msg.key, order.order_uid);
            assert_eq!(
                order.date_created,
                base_created + chrono::Duration::seconds(seen.len() as i64)
            );
            seen.push(order.order_uid);
        }

        assert_eq!(seen.len(), 3);
        seen.dedup();
        assert_eq!(seen.len(), 3, "order identifiers must be unique");
    }
}
