//! Fill records emitted by quote reconciliation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Price;
use crate::ids::{MarketId, OrderId, TokenId};
use crate::order::Side;

/// One detected fill, externalized from the quote pair into the
/// inventory ledger and the persisted store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillRecord {
    pub market_id: MarketId,
    pub token_id: TokenId,
    pub order_id: OrderId,
    pub side: Side,
    /// Average fill price when the venue reports it, quote price otherwise.
    pub price: Price,
    pub size_matched: Decimal,
    pub detected_at: DateTime<Utc>,
}
