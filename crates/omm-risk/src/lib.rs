//! Risk management for the outcome market-making bot.
//!
//! Two responsibilities: a synchronous validation gate every quote must
//! pass before placement, and a drawdown kill switch tracking portfolio
//! value against its high-water mark with hysteresis-based auto-resume.
//! Nothing here terminates the process; breaches degrade to "skip this
//! quote" or "pause trading".

pub mod advisor;
pub mod manager;

pub use advisor::{assess_or_fallback, AdvisorOpinion, ApproveAll, RiskAdvisor};
pub use manager::{InventoryRisk, QuoteReject, RiskConfig, RiskManager, RiskMode};
