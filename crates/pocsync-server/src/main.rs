use anyhow::{Context, Result};
use pocsync_server::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up a local .env before reading the environment
    dotenv::dotenv().ok();

    let config = ServerConfig::load();

    pocsync_server::run(config).await.context("Server error")?;

    Ok(())
}
