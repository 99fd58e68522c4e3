use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_read_model::config::AppConfig;
use order_read_model::metrics::{self, QueryMetrics};
use order_read_model::store::{InMemoryOrderStore, OrderStore, PgOrderStore};
use order_read_model::QueryService;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging, overridable with RUST_LOG
    // Example: RUST_LOG=order_read_model=trace order-read-model --strategy eager-all
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_read_model=debug")),
        )
        .init();

    let config = AppConfig::parse();
    let query_config = config.query_config()?;

    tracing::info!(
        strategy = %config.strategy,
        batch_size = query_config.batch_size.get(),
        timeout = ?query_config.timeout,
        "🚀 Starting order read model"
    );

    // === 1. Order store ===
    let mut pg_store = None;
    let store: Arc<dyn OrderStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to PostgreSQL...");
            let store = PgOrderStore::connect(url, config.max_connections, Duration::from_secs(5)).await?;
            pg_store = Some(store.clone());
            Arc::new(store)
        }
        None => {
            tracing::info!("No DATABASE_URL set, reading seeded in-memory orders");
            Arc::new(InMemoryOrderStore::demo())
        }
    };

    // === 2. Metrics ===
    let metrics = Arc::new(QueryMetrics::new()?);
    if let Some(port) = config.metrics_port {
        let registry = metrics.registry().clone();
        actix_web::rt::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(registry, port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    }

    // === 3. Query ===
    let service = QueryService::new(store, query_config).with_metrics(metrics);
    let envelope = service.query_envelope(config.strategy, config.pagination()).await?;

    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if config.metrics_port.is_some() {
        tracing::info!("⏳ Serving metrics, press Ctrl-C to exit");
        tokio::signal::ctrl_c().await?;
    }

    if let Some(store) = pg_store {
        store.close().await;
    }

    Ok(())
}
