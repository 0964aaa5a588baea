use std::sync::{Arc, Mutex};

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chairbook::config::AppConfig;
use chairbook::db;
use chairbook::handlers;
use chairbook::services::notify::webhook::WebhookNotifier;
use chairbook::services::notify::{LogNotifier, Notifier};
use chairbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let notifier: Box<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            tracing::info!("sending booking notifications to {url}");
            Box::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            tracing::info!("NOTIFY_WEBHOOK_URL not set, booking notifications are logged only");
            Box::new(LogNotifier)
        }
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        notifier,
    });

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
