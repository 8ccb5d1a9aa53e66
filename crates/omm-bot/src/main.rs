//! Outcome market-maker entry point.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;

use omm_bot::{AppConfig, MarketMaker, OperatingMode, PaperVenue};
use omm_core::TokenId;
use omm_store::MemoryStore;

/// Binary-outcome prediction-market maker
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via OMM_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    omm_bot::init_logging();

    info!("Starting outcome market maker v{}", env!("CARGO_PKG_VERSION"));

    // Config path precedence: CLI arg > OMM_CONFIG env var > default.
    let config = match args.config {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::load()?,
    };
    info!(
        mode = ?config.operating_mode,
        pricing = ?config.pricing_mode,
        markets = config.markets.len(),
        "Configuration loaded"
    );

    match config.operating_mode {
        OperatingMode::Paper => {
            let mids: Vec<(TokenId, rust_decimal::Decimal)> = config
                .markets
                .iter()
                .map(|m| (m.token_id.clone(), m.paper_mid))
                .collect();
            let venue = Arc::new(PaperVenue::new(config.mm.paper_balance, &mids));
            let store = Arc::new(MemoryStore::new());
            let maker = MarketMaker::new(config, venue, store);
            maker.run().await?;
        }
        OperatingMode::Live => {
            // The live CLOB connector plugs in through the VenueClient
            // seam; this build ships without one.
            bail!("live venue connector not configured in this build");
        }
    }

    Ok(())
}
