use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal;

use push_dispatch_service::config::Settings;
use push_dispatch_service::push::VapidKeys;
use push_dispatch_service::server::{create_app, AppState};
use push_dispatch_service::telemetry::init_telemetry;

#[derive(Parser)]
#[command(name = "push-dispatch-service")]
#[command(version)]
#[command(about = "Web Push subscription registry and notification scheduler")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service (default)
    Serve,
    /// Print a fresh VAPID key pair in environment-file form
    GenerateVapidKeys,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::GenerateVapidKeys => generate_vapid_keys(),
        Commands::Serve => serve().await,
    }
}

fn generate_vapid_keys() -> Result<()> {
    let keys = VapidKeys::generate()?;
    println!("VAPID_PUBLIC_KEY={}", keys.public_key_base64url());
    println!("VAPID_PRIVATE_KEY={}", keys.private_key_base64url());
    Ok(())
}

async fn serve() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    let _telemetry = init_telemetry(&settings.otel, settings.json_logs())?;
    tracing::info!("Configuration loaded");

    // Create application state
    let state = AppState::new(settings.clone());
    let scheduler = state.scheduler.clone();
    tracing::info!("Application state initialized");

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    log_startup_banner(&settings, &addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler())
        .await?;

    scheduler.shutdown();

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn log_startup_banner(settings: &Settings, addr: &str) {
    tracing::info!(
        addr = %addr,
        port = settings.server.port,
        "Push notification server running"
    );
    tracing::info!(
        public_key = settings.vapid.public_key.as_deref().unwrap_or("MISSING"),
        private_key = if settings.vapid.private_key.is_some() { "SET" } else { "MISSING" },
        subject = %settings.vapid.subject,
        "VAPID identity"
    );
    tracing::info!(
        environment = %settings.environment,
        production = settings.is_production(),
        "Environment"
    );
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
