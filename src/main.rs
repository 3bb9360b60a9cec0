//! vaultscribe CLI entrypoint

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vaultscribe::cli::Cli;
use vaultscribe::config::{self, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = config::find_vault_root(cli.vault.clone())?;
    let settings = Settings::load(&root)?;

    // Initialize tracing; the debug setting lowers the default filter
    let default_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    cli.execute(root, settings).await
}
