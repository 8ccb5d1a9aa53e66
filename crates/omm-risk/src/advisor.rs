//! Advisory oracle seam.
//!
//! External advisors (risk officer, market scorer, event guard) are
//! optional, fallible collaborators. The dependency is injected at
//! construction time; `ApproveAll` is the documented default when no
//! advisor is wired up. Advisor failure never propagates: the caller
//! falls back to a conservative opinion and keeps trading.

use futures_util::future::BoxFuture;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

use omm_core::MarketId;

/// Best-effort recommendation for one market's quoting cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisorOpinion {
    pub approve: bool,
    /// Multiplier on quote size, 1 = unchanged.
    pub size_factor: Decimal,
    /// External event-risk signal; widens spreads downstream.
    pub event_risk: bool,
}

impl AdvisorOpinion {
    /// Full approval, no adjustments.
    pub fn approve() -> Self {
        Self {
            approve: true,
            size_factor: Decimal::ONE,
            event_risk: false,
        }
    }

    /// Conservative fallback used when the advisor errors or times out:
    /// keep quoting at half size and treat event risk as elevated.
    pub fn conservative() -> Self {
        Self {
            approve: true,
            size_factor: dec!(0.5),
            event_risk: true,
        }
    }
}

/// Advisory oracle contract.
pub trait RiskAdvisor: Send + Sync {
    fn assess(&self, market_id: &MarketId) -> BoxFuture<'_, Result<AdvisorOpinion, String>>;
}

/// Default advisor: approves everything unchanged.
#[derive(Debug, Default)]
pub struct ApproveAll;

impl RiskAdvisor for ApproveAll {
    fn assess(&self, _market_id: &MarketId) -> BoxFuture<'_, Result<AdvisorOpinion, String>> {
        Box::pin(async { Ok(AdvisorOpinion::approve()) })
    }
}

/// Consult the advisor, degrading to the conservative fallback on error.
pub async fn assess_or_fallback(advisor: &dyn RiskAdvisor, market_id: &MarketId) -> AdvisorOpinion {
    match advisor.assess(market_id).await {
        Ok(opinion) => opinion,
        Err(err) => {
            warn!(market = %market_id.short(), %err, "advisor failed, using conservative fallback");
            AdvisorOpinion::conservative()
        }
    }
}
