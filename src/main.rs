// src/main.rs

//! The main entry point for the Slotward daemon.

use anyhow::Result;
use slotward::config::Config;
use std::env;
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    // Handle the --version flag.
    if args.contains(&"--version".to_string()) {
        println!("Slotward version {VERSION}");
        return Ok(());
    }

    // Determine the configuration path. It can be provided via a --config
    // flag; otherwise, it defaults to "slotward.toml".
    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("slotward.toml");

    // Load the configuration from the determined path. The daemon cannot run
    // without a valid configuration.
    let config = match Config::from_file(config_path).await {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{config_path}\": {e}");
            std::process::exit(1);
        }
    };

    // Setup logging with compact format and ANSI colors; RUST_LOG overrides
    // the configured level.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .compact()
        .with_ansi(true)
        .init();

    if let Err(e) = slotward::reconciler::run(config).await {
        error!("Reconciler runtime error: {}", e);
        return Err(e);
    }

    Ok(())
}
