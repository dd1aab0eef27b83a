use tracing_subscriber::EnvFilter;

use learnhub::{AppState, config::Config, create_router, db};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("learnhub=info,tower_http=info")),
        )
        .init();

    // Missing signing secrets stop us here, before anything is served.
    let config = Config::from_env().inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))?;

    let pool = db::create_db_pool(&config.database_url).await?;
    let app = create_router(AppState::new(pool, &config)?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
