/// Image Ingest - base64 image upload service
///
/// Receives camera captures and lost-and-found photos from the volunteer
/// app and persists them to object storage.
use anyhow::Context;
use image_ingest::{config::LoggingConfig, server, AppContext, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::from_env().context("failed to load configuration")?;

    // Initialize logging
    init_logging(&config.logging);

    // Print banner
    print_banner();

    // Create application context
    let ctx = AppContext::new(config)
        .await
        .context("failed to initialize application")?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&logging.level)
        .unwrap_or_else(|_| "image_ingest=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_banner() {
    println!(
        r#"
    _                              _                       _
   (_)_ __ ___   __ _  __ _  ___  (_)_ __   __ _  ___  ___| |_
   | | '_ ` _ \ / _` |/ _` |/ _ \ | | '_ \ / _` |/ _ \/ __| __|
   | | | | | | | (_| | (_| |  __/ | | | | | (_| |  __/\__ \ |_
   |_|_| |_| |_|\__,_|\__, |\___| |_|_| |_|\__, |\___||___/\__|
                      |___/                |___/

        Image Ingest Server v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
