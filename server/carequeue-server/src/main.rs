use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use tracing::info;
use tracing_subscriber::{fmt, fmt::time::ChronoUtc, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use carequeue_server::config::{LogFormat, LoggingSettings};
use carequeue_server::{create_app, AppConfig, CareQueueServer};

/// CareQueue HTTP server
#[derive(Parser, Debug)]
#[command(name = "carequeue-server")]
#[command(about = "Clinic appointment, token queue and staff management API")]
struct Args {
    /// Bind address (overrides server.host)
    #[arg(long, env = "CAREQUEUE_HOST")]
    host: Option<String>,

    /// Port (overrides server.port)
    #[arg(short, long, env = "CAREQUEUE_PORT")]
    port: Option<u16>,

    /// Configuration file; a missing file is ignored
    #[arg(short, long, default_value = "carequeue.toml")]
    config: String,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config.logging, args.verbose);
    config.validate().context("Invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config,
        "Starting CareQueue server"
    );

    let bind_address = config.bind_address();
    let server = CareQueueServer::new(config).await?;
    let backend = server.store.backend();
    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;

    info!(address = %bind_address, store = backend, "CareQueue listening");
    info!("Health check: http://{}/health", bind_address);
    info!("API docs: http://{}/swagger-ui", bind_address);

    axum::serve(listener, app).await.context("HTTP server error")?;
    Ok(())
}

fn init_tracing(settings: &LoggingSettings, verbose: bool) {
    let level = if verbose { "debug" } else { settings.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("carequeue_server={},tower_http=info,sqlx=warn", level).into());

    match settings.format {
        LogFormat::Pretty => {
            let use_colors = std::env::var("NO_COLOR").is_err() && atty::is(atty::Stream::Stdout);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(use_colors)
                        .with_level(true),
                )
                .init();

            if use_colors {
                print_startup_banner();
            }
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_timer(ChronoUtc::rfc_3339())
                        .with_ansi(false)
                        .json(),
                )
                .init();
        }
    }
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                  CAREQUEUE                   ║".bright_cyan());
    println!("{}", "║     Clinic appointments and token queues     ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════╝".bright_cyan());
    println!();
}
