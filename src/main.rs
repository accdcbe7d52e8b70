use std::net::SocketAddr;
use tracing::{error, info};

mod account;
mod api;
mod battle;
mod config;
mod data;
mod db;
mod fair;
mod house;
mod money;
mod odds;
mod protocol;

use api::AppState;
use config::ServerConfig;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("case_odds_server=info".parse().expect("static directive")),
        )
        .init();

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let state = match AppState::new(&config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    // Prune finished battles and expired rate limit windows
    let prune_state = state.clone();
    let maintenance = config.maintenance.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(maintenance.interval());
        loop {
            interval.tick().await;
            prune_state.prune(maintenance.battle_retention());
        }
    });

    let app = api::router(state);

    info!("Case server listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await {
        error!("Server error: {}", e);
    }
}
