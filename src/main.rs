//! RentKar command-line client
//!
//! Talks to the RentKar REST backend to manage borrow requests.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rentkar_client::{
    cli::{self, Cli},
    config::AppConfig,
    services::{notifications::ChannelNotifier, Services},
    AppError, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load_from(&cli.config).context("Failed to load configuration")?;
    if let Some(api_url) = cli.api_url.clone() {
        config.api.base_url = api_url;
    }
    if let Some(level) = cli.log_level.clone() {
        config.logging.level = level;
    }

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("rentkar_client={},rentkar={}", config.logging.level, config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::debug!("RentKar client v{} using {}", env!("CARGO_PKG_VERSION"), config.api.base_url);

    // Notifications are printed by the CLI after each command
    let (notifier, mut notifications) = ChannelNotifier::new();
    let services = Services::new(&config, Arc::new(notifier)).context("Failed to create services")?;

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    state.services.session.restore().await;

    match cli::run(cli.command, &state.services, &mut notifications).await {
        Ok(code) => Ok(code),
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("Error: {}", e.user_message());
            if let AppError::Validation { field_errors, .. } = &e {
                let mut fields: Vec<_> = field_errors.iter().collect();
                fields.sort();
                for (field, message) in fields {
                    eprintln!("  {}: {}", field, message);
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
