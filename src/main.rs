use std::sync::Arc;

use anyhow::Context;

use inquiry_sentiment::config::AppConfig;
use inquiry_sentiment::handler::InquiryHandler;
use inquiry_sentiment::routes::{INQUIRY_PATH, inquiry_routes};
use inquiry_sentiment::sentiment::{SentimentClassifier, TextAnalyticsClient};
use inquiry_sentiment::store::{DocumentStore, InquiryStore, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    eprintln!("📨 Inquiry Sentiment v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Sentiment: {}", config.text_analytics.endpoint);
    eprintln!(
        "   Store: {} ({}/{})",
        config.store.url, config.store.database_id, config.store.container_id
    );

    // ── Store ───────────────────────────────────────────────────────────
    let backend: Arc<dyn DocumentStore> = Arc::new(
        LibSqlBackend::connect(&config.store)
            .await
            .with_context(|| format!("failed to open store at {}", config.store.url))?,
    );
    let store = Arc::new(InquiryStore::new(backend, &config.store));
    store
        .ensure_schema()
        .await
        .context("failed to provision inquiry container")?;

    // ── Classifier ──────────────────────────────────────────────────────
    let classifier: Arc<dyn SentimentClassifier> =
        Arc::new(TextAnalyticsClient::new(&config.text_analytics));

    // ── HTTP ────────────────────────────────────────────────────────────
    let handler = Arc::new(InquiryHandler::new(classifier, store));
    let app = inquiry_routes(handler);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.server.port))?;
    eprintln!(
        "   Inquiries: http://0.0.0.0:{}{}\n",
        config.server.port, INQUIRY_PATH
    );
    tracing::info!(port = config.server.port, "Inquiry server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
