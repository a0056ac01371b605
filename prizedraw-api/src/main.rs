use std::net::SocketAddr;
use std::sync::Arc;
use prizedraw_api::{app, AppState, Backends};
use prizedraw_store::app_config::Config;
use prizedraw_store::{DbClient, InMemoryStore, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prizedraw_api=debug,prizedraw_pool=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting prize draw service on port {}", config.server.port);

    let (backends, prize_rules) = if config.database.in_memory {
        tracing::warn!("Serving from process memory; nothing survives a restart");
        (Backends::in_memory(Arc::new(InMemoryStore::new())), config.prize_rules.clone())
    } else {
        let db = DbClient::new(&config.database.url, config.database.max_connections).await?;
        db.migrate().await?;
        let rules = match db.fetch_prize_rules(config.prize_rules.clone()).await {
            Ok(rules) => rules,
            Err(e) => {
                tracing::warn!("Could not load business rules, using configured defaults: {}", e);
                config.prize_rules.clone()
            }
        };
        (Backends::postgres(&db), rules)
    };

    // Pricing still works without the cache, just slower.
    let redis = match &config.redis.url {
        Some(url) => match RedisClient::new(url) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!("Redis unavailable, price cache disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let (app_state, worker) = AppState::assemble(backends, prize_rules, redis, prometheus::Registry::new())?;
    tokio::spawn(worker.run());

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
