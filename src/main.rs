//! OpenSASE Storefront - Self-hosted E-commerce Platform

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use storefront::{
    api::build_router,
    config::{AppConfig, StoreBackend},
    events::EventPublisher,
    payment::{OfflineGateway, PaymentGateway},
    services::{StoreSettings, Storefront},
    store::{MemoryStore, PgStore, Store},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();
    tracing::debug!(?config, "configuration loaded");

    let store: Arc<dyn Store> = match (config.backend, config.database_url.as_deref()) {
        (StoreBackend::Postgres, Some(url)) => {
            let store = PgStore::connect(url, config.pool_config()).await?;
            store.migrate().await?;
            tracing::info!(max_connections = config.db_max_connections, "connected to postgres");
            Arc::new(store)
        }
        (StoreBackend::Postgres, None) => anyhow::bail!("DATABASE_URL is required for the postgres backend"),
        (StoreBackend::Memory, _) => {
            tracing::warn!("using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let gateway: Arc<dyn PaymentGateway> = Arc::new(OfflineGateway);
    tracing::info!(gateway = gateway.name(), events = events.is_enabled(), currency = %config.currency, "storefront ready");

    let state = Storefront::new(store, events, gateway, StoreSettings::from(&config));
    let app = build_router(state);

    let addr = config.bind_addr();
    tracing::info!("OpenSASE Storefront listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
