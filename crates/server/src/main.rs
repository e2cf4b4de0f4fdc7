use std::{net::SocketAddr, sync::Arc};

use quickpoll::{
    config::Config,
    routes::{AppState, router},
    store::{MemoryPollStore, PgPollStore, PollStore},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("quickpoll=info,server=info,tower_http=info")),
        )
        .init();

    let config = Config::load();

    let store: Arc<dyn PollStore> = match &config.database_url {
        Some(url) => {
            let store = PgPollStore::connect(url, config.max_connections, config.policy).await?;
            tracing::info!("Connected to database");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, polls are kept in memory only");
            Arc::new(MemoryPollStore::new(config.policy))
        }
    };

    let addr = config.listen_addr();
    let app = router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
