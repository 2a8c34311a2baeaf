mod config;
mod error;
mod routes;
mod upstream;
mod vault;

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use routes::AppState;
use upstream::{Relay, TokenBroker};
use vault::{CredentialCodec, Vault};

/// AtomSync relay. Keeps vendor fan credentials in a sealed cookie and
/// relays device calls to the vendor cloud API.
#[derive(Parser, Debug)]
#[command(name = "atomsync-relay", version, about)]
struct Cli {
    /// Path to a TOML configuration file (environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,
}

fn fail(message: impl std::fmt::Display) -> ! {
    tracing::error!("{message}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut cfg = config::load_config(cli.config.as_deref())
        .unwrap_or_else(|e| fail(format!("Configuration error: {e}")));

    // CLI --port overrides config
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }

    // Key derivation happens exactly once, before anything can serve.
    let codec = CredentialCodec::from_secret(&cfg.server.auth_secret)
        .unwrap_or_else(|e| fail(format!("Configuration error: {e}")));

    let client = upstream::build_client(Duration::from_secs(cfg.upstream.timeout_secs))
        .unwrap_or_else(|e| fail(e));

    let vault = Vault::new(
        codec,
        TokenBroker::new(client.clone(), cfg.upstream.base_url.clone()),
        Relay::new(client),
    );

    let cors = routes::cors_layer(&cfg.server.cors_origin).unwrap_or_else(|e| fail(e));

    tracing::info!(
        environment = ?cfg.server.environment,
        base_url = %cfg.upstream.base_url,
        timeout_secs = cfg.upstream.timeout_secs,
        cors_origin = %cfg.server.cors_origin,
        "Configuration loaded successfully"
    );

    let app = routes::router(AppState {
        vault,
        secure_cookies: cfg.server.environment.is_production(),
    })
    .layer(cors);

    let bind_addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    tracing::info!("Listening on {bind_addr}");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| fail(format!("Failed to bind to {bind_addr}: {e}")));

    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| fail(format!("Server error: {e}")));
}
