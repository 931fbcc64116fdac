//! order-server — order ingestion and read service
//!
//! Long-running service that:
//! - Consumes order records from an asynchronous feed (validate → persist →
//!   publish into the in-memory cache)
//! - Serves single-order reads from the cache with store fallback, and
//!   store-sourced preview lists
//! - Evicts cache entries past their TTL on a fixed period

mod api;
mod cache;
mod config;
mod db;
mod error;
mod model;
mod state;
mod stream;
#[cfg(test)]
mod testutil;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use cache::OrderCache;
use config::Config;
use db::PgOrderStore;
use error::BoxError;
use state::AppState;
use stream::{OrderConsumer, emulator};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting order-server (env: {})", config.environment);

    let pool = db::connect(&config.database_url).await?;
    let store = Arc::new(PgOrderStore::new(pool.clone()));

    // Warm-load is part of construction; a failure here aborts startup.
    let cache = Arc::new(OrderCache::new(store, config.cache_warm_limit).await?);

    let shutdown = CancellationToken::new();

    // Inbound order feed
    let (feed_tx, feed_rx) = mpsc::channel(config.stream_buffer);
    let consumer = OrderConsumer::new(cache.clone(), feed_rx, shutdown.clone());
    let consumer_handle = tokio::spawn(consumer.run());

    let evictor_handle = tokio::spawn(cache.clone().run_evictor(
        config.cache_ttl,
        config.cache_cleanup_interval,
        shutdown.clone(),
    ));

    if config.emulator_messages > 0 {
        let opts = emulator::EmulatorOptions {
            count: config.emulator_messages,
            delay: config.emulator_delay,
        };
        tokio::spawn(emulator::run(feed_tx.clone(), opts, shutdown.clone()));
    }
    // The channel stays open for the process lifetime; external producers
    // would hold their own senders.
    let _feed_tx = feed_tx;

    let state = AppState {
        cache: cache.clone(),
    };
    let app = api::create_router(state);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("order-server HTTP listening on {addr}");

    let http_shutdown = shutdown.clone();
    let server_handle = tokio::spawn(async move {
        let graceful = axum::serve(listener, app)
            .with_graceful_shutdown(async move { http_shutdown.cancelled().await });
        if let Err(e) = graceful.await {
            tracing::error!("HTTP server error: {e}");
        }
    });

    shutdown_signal().await;
    tracing::info!("shutdown signal received");
    shutdown.cancel();

    // Intake stops first so in-flight saves finish, then the listener drains,
    // then the evictor; the pool closes last so no save loses its connection.
    let _ = consumer_handle.await;
    let _ = server_handle.await;
    let _ = evictor_handle.await;
    pool.close().await;

    tracing::info!("order-server stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
