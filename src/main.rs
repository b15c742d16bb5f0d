use anyhow::Context;
use tracing_subscriber::EnvFilter;

use estate_api::{app, config, database, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("estate_api=info,tower_http=info")),
        )
        .init();

    let config = config::config();
    tracing::info!("starting estate-api in {:?} mode", config.environment);

    let pool = database::connect(&config.database)
        .await
        .context("database connection failed")?;
    database::run_migrations(&pool)
        .await
        .context("migrations failed")?;
    tracing::info!("database connected");

    let app = app(AppState::new(pool));

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("server listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
