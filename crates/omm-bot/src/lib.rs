//! Binary-outcome market-making bot: configuration, orchestration and
//! the paper venue.
//!
//! The loop in [`app::MarketMaker`] is generic over the venue and store
//! seams, so the same orchestration runs against the paper venue, the
//! mock venue in tests, or a live CLOB connector.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod paper;

pub use app::MarketMaker;
pub use config::{AppConfig, MarketConfig, MmConfig, OperatingMode, PricingMode};
pub use error::{AppError, AppResult};
pub use logging::init_logging;
pub use paper::PaperVenue;
