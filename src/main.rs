pub mod auth;
pub mod config;
pub mod err;
pub mod filter;
pub mod ident;
pub mod import;
pub mod models;
pub mod repo;
pub mod resources;
pub mod routes;
pub mod store;
pub mod validate;


use std::sync::Arc;

use anyhow::anyhow;
use sqlx::postgres::PgPoolOptions;

use crate::auth::EntraId;
use crate::config::Config;
use crate::routes::AppState;
use crate::store::{DocumentStore, MemoryStore, PgStore};

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let url = match &config.database_url {
        Some(url) if !url.is_empty() => url,
        _ => {
            log::warn!("DATABASE_URL is not set, records are kept in memory only");
            return Ok(Arc::new(MemoryStore::new()));
        }
    };

    let pg = PgPoolOptions::new().max_connections(5).connect(url).await?;
    let store = PgStore::new(pg);
    store
        .prepare()
        .await
        .map_err(|err| anyhow!("could not prepare document table: {:?}", err))?;
    log::info!("Connected to PostgreSQL document store");
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter()))
        .init();

    let state = AppState {
        store: connect_store(&config).await?,
        identity: Arc::new(EntraId::new(&config)),
    };
    let app = routes::router(state);

    let addr = config.addr()?;
    log::info!("Starting Testbook HTTP Server on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
