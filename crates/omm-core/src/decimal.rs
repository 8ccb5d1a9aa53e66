//! Precision-safe decimal types for outcome-token trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors critical in financial calculations.
//!
//! Outcome tokens trade on a [0, 1] dollar scale with a fixed $0.01 tick.
//! Spread and delta quantities are expressed in "points" where
//! 1 point = $0.01 (i.e. `points = price * 100`).

use crate::error::CoreError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Venue tick size: one cent.
pub const TICK: Decimal = dec!(0.01);

/// Lowest quotable price.
pub const MIN_PRICE: Decimal = dec!(0.01);

/// Highest quotable price.
pub const MAX_PRICE: Decimal = dec!(0.99);

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Round to the venue tick (half-up to two decimal places).
    #[inline]
    pub fn round_to_tick(&self) -> Self {
        Self(self.0.round_dp(2))
    }

    /// Clamp into the quotable [0.01, 0.99] range.
    #[inline]
    pub fn clamp_quotable(&self) -> Self {
        Self(self.0.max(MIN_PRICE).min(MAX_PRICE))
    }

    /// Express this price in points (1 pt = $0.01).
    #[inline]
    pub fn to_points(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }

    /// Build a price from a quantity in points.
    #[inline]
    pub fn from_points(points: Decimal) -> Self {
        Self(points / Decimal::from(100))
    }

    /// Absolute distance to another price, in points.
    #[inline]
    pub fn distance_points(&self, other: Price) -> Decimal {
        (self.0 - other.0).abs() * Decimal::from(100)
    }

    /// Validate as a quotable venue price: inside [0.01, 0.99] and on
    /// the $0.01 tick.
    pub fn validate_quotable(&self) -> crate::error::Result<()> {
        if self.0 < MIN_PRICE || self.0 > MAX_PRICE {
            return Err(CoreError::PriceOutOfRange(self.0));
        }
        if !(self.0 % TICK).is_zero() {
            return Err(CoreError::OffTick(self.0));
        }
        Ok(())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// Size/quantity in outcome shares with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Notional value in USDC: size * price.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }

    /// Validate as a placeable order size.
    pub fn validate_order(&self) -> crate::error::Result<()> {
        if !self.is_positive() {
            return Err(CoreError::NonPositiveSize(self.0));
        }
        Ok(())
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Size {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Size {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Size {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_to_tick() {
        assert_eq!(Price::new(dec!(0.51672)).round_to_tick().inner(), dec!(0.52));
        assert_eq!(Price::new(dec!(0.514)).round_to_tick().inner(), dec!(0.51));
    }

    #[test]
    fn test_clamp_quotable() {
        assert_eq!(Price::new(dec!(1.20)).clamp_quotable().inner(), dec!(0.99));
        assert_eq!(Price::new(dec!(-0.05)).clamp_quotable().inner(), dec!(0.01));
        assert_eq!(Price::new(dec!(0.50)).clamp_quotable().inner(), dec!(0.50));
    }

    #[test]
    fn test_points_conversion() {
        let p = Price::new(dec!(0.55));
        assert_eq!(p.to_points(), dec!(55));
        assert_eq!(Price::from_points(dec!(55)), p);
    }

    #[test]
    fn test_distance_points() {
        let a = Price::new(dec!(0.52));
        let b = Price::new(dec!(0.49));
        assert_eq!(a.distance_points(b), dec!(3));
        assert_eq!(b.distance_points(a), dec!(3));
    }

    #[test]
    fn test_notional() {
        let size = Size::new(dec!(20));
        let price = Price::new(dec!(0.50));
        assert_eq!(size.notional(price), dec!(10));
    }

    #[test]
    fn test_validate_quotable() {
        assert!(Price::new(dec!(0.48)).validate_quotable().is_ok());
        assert!(Price::new(dec!(0.01)).validate_quotable().is_ok());
        assert!(Price::new(dec!(0.99)).validate_quotable().is_ok());
        assert_eq!(
            Price::new(dec!(1.05)).validate_quotable(),
            Err(CoreError::PriceOutOfRange(dec!(1.05)))
        );
        assert_eq!(
            Price::new(dec!(0.005)).validate_quotable(),
            Err(CoreError::PriceOutOfRange(dec!(0.005)))
        );
        assert_eq!(
            Price::new(dec!(0.485)).validate_quotable(),
            Err(CoreError::OffTick(dec!(0.485)))
        );
    }

    #[test]
    fn test_validate_order_size() {
        assert!(Size::new(dec!(10)).validate_order().is_ok());
        assert_eq!(
            Size::ZERO.validate_order(),
            Err(CoreError::NonPositiveSize(Decimal::ZERO))
        );
        assert_eq!(
            Size::new(dec!(-3)).validate_order(),
            Err(CoreError::NonPositiveSize(dec!(-3)))
        );
    }
}
