use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use freightdesk::{
    alerts::WebhookAlerts, config::AppConfig, db, renderer::BrowserRenderer, routes::create_router,
    state::AppState, storage::S3Storage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        s3_bucket = %config.s3_bucket,
        webdriver_url = %config.webdriver_url,
        alerts_enabled = config.alert_webhook_url.is_some(),
        "loaded configuration"
    );

    let pool = db::connect(&config)?;
    let storage = Arc::new(S3Storage::connect(&config).await?);
    let renderer = Arc::new(BrowserRenderer::new(
        config.webdriver_url.clone(),
        config.render_debug_dir.clone(),
    ));
    let alerts = Arc::new(WebhookAlerts::new(config.alert_webhook_url.clone()));

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(pool, config, storage, renderer, alerts);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
