use anyhow::Context;
use bulletcore::config::RelayConfig;
use bulletcore::relay::{self, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = RelayConfig::from_env()?;
    let bind_address = config.bind_address();
    let client_url = config.client_url.clone();

    let state = AppState::new(config);
    relay::spawn_sweeper(&state);
    let app = relay::router(state).context("CLIENT_HOST/CLIENT_PORT do not form a valid origin")?;

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;

    info!(
        "Bulletcore matchmaking server listening on http://{}",
        bind_address
    );
    info!("WebSocket endpoint: ws://{}/ws", bind_address);
    info!("CORS configured for: {}", client_url);

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;
    Ok(())
}
