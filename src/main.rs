mod api;
mod cache;
mod config;
mod error;
mod eval;
mod tiers;
mod types;

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::{router, ApiState, LatencyStats};
use crate::cache::DrawCache;
use crate::config::Config;
use crate::error::Result;
use crate::eval::BatchRunner;
use crate::tiers::{PrizeTable, WinPolicy};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Prize table: built-in French Loto rules, or a JSON override ---
    let table = match &cfg.prize_table_path {
        Some(path) => {
            let table = PrizeTable::load(Path::new(path))?;
            info!(rules = table.rules.len(), "Loaded prize table from {path} ({} rules)", table.rules.len());
            table
        }
        None => PrizeTable::french_loto(),
    };

    // --- Engine wiring: snapshot cell, latency histogram, batch runner ---
    let cache = DrawCache::new();
    let latency = Arc::new(LatencyStats::new());
    let runner = BatchRunner::new(
        Arc::clone(&cache),
        Arc::new(table),
        WinPolicy::default(),
        cfg.ticket_price,
        Arc::clone(&latency),
    );
    info!(
        ticket_price = cfg.ticket_price,
        "Engine ready (ticket price {:.2}); waiting for a cache build",
        cfg.ticket_price,
    );

    // --- HTTP API server ---
    let api_state = ApiState { cache, runner, latency };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
