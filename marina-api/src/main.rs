use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use marina_api::{app, AppState, AuthConfig, Backends};
use marina_core::repository::ObjectStore;
use marina_store::app_config::{Config, StoreBackend};
use marina_store::listener::start_change_listener;
use marina_store::{
    ChangeHub, DbClient, InMemoryStore, LocalObjectStore, PgAvailabilityRepository,
    PgBookingRepository, PgContentRepository, PgRoleRepository, RedisClient,
};
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marina_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Marina API on port {}", config.server.port);

    // Change feed for SSE subscribers
    let hub = Arc::new(ChangeHub::default());

    let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(
        &config.storage.root_dir,
        &config.storage.public_base_url,
    ));

    let backends = match config.store.backend {
        StoreBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            if config.database.run_migrations {
                db.migrate().await.context("Failed to run migrations")?;
            }
            tokio::spawn(start_change_listener(db.pool.clone(), hub.clone()));

            Backends {
                bookings: Arc::new(PgBookingRepository::new(db.pool.clone())),
                availability: Arc::new(PgAvailabilityRepository::new(db.pool.clone())),
                content: Arc::new(PgContentRepository::new(db.pool.clone())),
                roles: Arc::new(PgRoleRepository::new(db.pool.clone())),
                objects,
            }
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Backends::in_memory(Arc::new(InMemoryStore::new(hub.clone())), objects)
        }
    };

    // Redis only backs the intake rate limiter
    let redis = match &config.redis {
        Some(redis_config) => match RedisClient::new(&redis_config.url).await {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!("Redis unavailable, booking intake is not rate limited: {}", e);
                None
            }
        },
        None => None,
    };

    let app_state = AppState::new(
        backends,
        hub,
        redis,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            admin_role: config.auth.admin_role.clone(),
        },
        config.business_rules.clone(),
        config.storage.max_upload_bytes,
    )
    .with_allowed_origins(config.server.allowed_origins.clone());

    let app = app(app_state).nest_service("/media", ServeDir::new(&config.storage.root_dir));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
