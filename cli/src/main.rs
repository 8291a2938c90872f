//! Hotel reservation service, standalone server
//!
//! ```sh
//! # Run with default config (~/.config/hotel-reservations/config.toml)
//! reservation-service
//!
//! # Custom config path
//! reservation-service --config /etc/hotel-reservations/config.toml
//!
//! # Throwaway in-memory store
//! reservation-service --database-url memory://
//!
//! # Validate config without starting
//! reservation-service --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use hotel_reservations::config::AppConfig;
use hotel_reservations::server::{init_tracing, ServerHandle, ServerOptions};

/// Hotel room reservations over REST, with booked events streamed over WebSocket.
#[derive(Parser, Debug)]
#[command(
    name = "reservation-service",
    version,
    about = "Hotel room reservation service",
    long_about = "REST API for booking hotel rooms. Overlapping stays of one room are \
                  rejected by the store, and every new booking is published as a \
                  RESERVATION_CREATED event.\n\n\
                  Default config: ~/.config/hotel-reservations/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "RESERVATIONS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the database URL (`memory://` for the in-memory store).
    #[arg(long)]
    database_url: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .unwrap_or_else(hotel_reservations::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => {
            let mut cfg = AppConfig::default();
            cfg.apply_env_overrides();
            (cfg, Some(e))
        }
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_tracing(&config);
    let loaded = load_error.is_none();
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        if !loaded {
            return Err(format!("invalid configuration: {}", config_path.display()).into());
        }
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Address     : {}", config.server.address());
        println!();
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await?;

    handle.install_signal_handler();
    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
