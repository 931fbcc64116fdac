//! Order stream ingestion
//!
//! The transport is an in-process partitioned-feed stand-in: a bounded mpsc
//! channel of opaque payloads with per-message acknowledgement. The consumer
//! drives each record through decode → validate → save → ack; any failure is
//! terminal for that record only. Redelivery, if any, is the transport's
//! concern.

pub mod emulator;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::cache::OrderCache;
use crate::model::Order;

/// One record from the stream. `ack` fires only after a successful save.
pub struct InboundMessage {
    pub key: String,
    pub payload: Vec<u8>,
    pub offset: u64,
    pub ack: Option<oneshot::Sender<u64>>,
}

pub struct OrderConsumer {
    cache: Arc<OrderCache>,
    rx: mpsc::Receiver<InboundMessage>,
    shutdown: CancellationToken,
}

impl OrderConsumer {
    pub fn new(
        cache: Arc<OrderCache>,
        rx: mpsc::Receiver<InboundMessage>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            cache,
            rx,
            shutdown,
        }
    }

    /// Consumption loop. Exits on shutdown or when the feed closes; an
    /// in-flight record always finishes before the loop stops accepting.
    pub async fn run(mut self) {
        tracing::info!("order consumer started");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("order consumer shutting down");
                    break;
                }
                msg = self.rx.recv() => {
                    match msg {
                        Some(msg) => self.handle_message(msg).await,
                        None => {
                            tracing::info!("order feed closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("order consumer stopped");
    }

    /// Received → decoded → validated → saved → acked. Every failure drops
    /// the record without acknowledging it and keeps the loop alive.
    async fn handle_message(&self, mut msg: InboundMessage) {
        let order: Order = match serde_json::from_slice(&msg.payload) {
            Ok(order) => order,
            Err(e) => {
                tracing::error!(key = %msg.key, offset = msg.offset, error = %e, "undecodable order payload dropped");
                return;
            }
        };

        if let Err(e) = order.validate() {
            tracing::error!(order_uid = %order.order_uid, error = %e, "invalid order dropped");
            return;
        }

        if let Err(e) = self.cache.save(&order).await {
            tracing::error!(order_uid = %order.order_uid, error = %e, "failed to save order");
            return;
        }

        tracing::info!(order_uid = %order.order_uid, offset = msg.offset, "order saved");
        if let Some(ack) = msg.ack.take() {
            let _ = ack.send(msg.offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockStore, sample_order};
    use std::time::Duration;

    fn message(payload: Vec<u8>, offset: u64) -> (InboundMessage, oneshot::Receiver<u64>) {
        let (ack_tx, ack_rx) = oneshot::channel();
        let msg = InboundMessage {
            key: format!("key-{offset}"),
            payload,
            offset,
            ack: Some(ack_tx),
        };
        (msg, ack_rx)
    }

    async fn expect_ack(rx: oneshot::Receiver<u64>) -> u64 {
        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("no ack within timeout")
            .expect("ack channel dropped")
    }

    #[tokio::test]
    async fn bad_records_are_skipped_and_never_acked() {
        let store = Arc::new(MockStore::default());
        let cache = Arc::new(OrderCache::new(store.clone(), 1000).await.unwrap());

        let (tx, rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(OrderConsumer::new(cache, rx, shutdown).run());

        // undecodable payload
        let (msg, bad_json_ack) = message(b"{not json".to_vec(), 1);
        tx.send(msg).await.unwrap();

        // validation failure: zero amount
        let mut invalid = sample_order("inv-1");
        invalid.payment.amount = 0;
        let (msg, invalid_ack) = message(serde_json::to_vec(&invalid).unwrap(), 2);
        tx.send(msg).await.unwrap();

        // validation failure: two-letter currency
        let mut invalid = sample_order("inv-2");
        invalid.payment.currency = "US".into();
        let (msg, currency_ack) = message(serde_json::to_vec(&invalid).unwrap(), 3);
        tx.send(msg).await.unwrap();

        // store failure
        store.fail_next();
        let valid = sample_order("ok-1");
        let (msg, store_fail_ack) = message(serde_json::to_vec(&valid).unwrap(), 4);
        tx.send(msg).await.unwrap();

        // a good record after all of the above still lands
        let good = sample_order("ok-2");
        let (msg, good_ack) = message(serde_json::to_vec(&good).unwrap(), 5);
        tx.send(msg).await.unwrap();

        assert_eq!(expect_ack(good_ack).await, 5);
        assert_eq!(store.save_calls(), 2); // ok-1 (failed) and ok-2

        // none of the dropped records were acknowledged
        assert!(bad_json_ack.await.is_err());
        assert!(invalid_ack.await.is_err());
        assert!(currency_ack.await.is_err());
        assert!(store_fail_ack.await.is_err());

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn saved_orders_are_immediately_readable() {
        let store = Arc::new(MockStore::default());
        let cache = Arc::new(OrderCache::new(store.clone(), 1000).await.unwrap());

        let (tx, rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(OrderConsumer::new(cache.clone(), rx, shutdown.clone()).run());

        let order = sample_order("A1");
        let (msg, ack) = message(serde_json::to_vec(&order).unwrap(), 7);
        tx.send(msg).await.unwrap();
        expect_ack(ack).await;

        let view = cache.get_by_id("A1").await.unwrap();
        assert_eq!(view, order.to_response());
        // served from the cache, no store read
        assert_eq!(store.get_calls(), 0);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn consumer_stops_on_shutdown() {
        let store = Arc::new(MockStore::default());
        let cache = Arc::new(OrderCache::new(store, 1000).await.unwrap());

        let (_tx, rx) = mpsc::channel::<InboundMessage>(1);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(OrderConsumer::new(cache, rx, shutdown.clone()).run());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("consumer did not stop on shutdown")
            .unwrap();
    }
}
