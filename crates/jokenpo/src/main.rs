use clap::Parser;
use jokenpo::{JokenpoServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if config.admin_token().is_none() {
        tracing::warn!("JOKENPO_ADMIN_TOKEN is not set, room provisioning is disabled");
    }

    let server = JokenpoServer::builder().config(config).build().await?;
    server.run().await?;
    Ok(())
}
