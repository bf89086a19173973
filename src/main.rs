mod api;
mod config;
mod core;
mod logger;
mod services;
mod utils;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cfg = match config::Config::init_global() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Failed to load config: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = logger::init_logger(&logger::LogSettings::from_config(cfg)) {
        eprintln!("Failed to init logger: {err}");
        std::process::exit(1);
    }

    cfg.print();
    if !cfg.has_api_key() {
        warn!("OPENAI_API_KEY is not set; chat requests will be rejected");
    }

    let state = match api::AppState::from_config(cfg) {
        Ok(state) => state,
        Err(err) => {
            error!("Failed to build assistant client: {err}");
            std::process::exit(1);
        }
    };

    let app = api::router(cfg, state);

    let ip = cfg
        .host
        .parse::<IpAddr>()
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let addr = SocketAddr::new(ip, cfg.port);
    info!("Server running on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(err) => {
            error!("Failed to bind: {err}");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app);

    if let Err(err) = server.with_graceful_shutdown(shutdown_signal()).await {
        error!("Server error: {err}");
    }
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Shutdown signal received");
}
