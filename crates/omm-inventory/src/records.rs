//! Wire/persistence records exchanged with the store and dashboards.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use omm_core::{MarketId, Price, TokenId};

use crate::ledger::Leg;

/// One persisted inventory row: a single token leg of a market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub market_id: MarketId,
    pub token_id: TokenId,
    pub net_position: Decimal,
    pub avg_entry_price: Price,
    pub realized_pnl: Decimal,
}

/// Reporting snapshot for one market, both legs combined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub market_id: MarketId,
    pub token_id: Option<TokenId>,
    pub no_token_id: Option<TokenId>,
    pub yes_position: Decimal,
    pub no_position: Decimal,
    pub yes_avg_entry: Price,
    pub no_avg_entry: Price,
    pub realized_pnl: Decimal,
    pub mergeable_pairs: Decimal,
}

/// One reconciliation divergence: memory disagreed with the store and
/// was corrected to the store value.
#[derive(Debug, Clone, Serialize)]
pub struct Divergence {
    pub market_id: MarketId,
    pub token_id: TokenId,
    pub leg: Leg,
    pub mem_position: Decimal,
    pub store_position: Decimal,
}
