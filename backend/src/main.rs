use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vms_backend::{
    app::build_app, config::Config, db::connection::create_pool,
    services::status_catalog::StatusCatalog, state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vms_backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        jwt_secret = %mask_secret(&config.jwt_secret),
        api_key = %config
            .api_key
            .as_deref()
            .map(mask_secret)
            .unwrap_or_else(|| "<disabled>".into()),
        time_zone = %config.time_zone,
        server_addr = %config.server_addr,
        db_max_connections = config.db_max_connections,
        "Loaded configuration from environment/.env"
    );

    let catalog = StatusCatalog::load(config.status_catalog_path.as_deref())?;

    // Initialize database
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let addr = config.server_addr;
    let app = build_app(AppState::new(pool, config, catalog));

    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
