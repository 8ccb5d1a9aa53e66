//! Validation errors for core quoting quantities.

use rust_decimal::Decimal;
use thiserror::Error;

/// A price or size that cannot go to the venue as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Price outside the quotable [0.01, 0.99] band.
    #[error("price {0} outside quotable range [0.01, 0.99]")]
    PriceOutOfRange(Decimal),

    /// Price not aligned to the $0.01 venue tick.
    #[error("price {0} off the 0.01 tick")]
    OffTick(Decimal),

    /// Zero or negative order size.
    #[error("size {0} is not positive")]
    NonPositiveSize(Decimal),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
