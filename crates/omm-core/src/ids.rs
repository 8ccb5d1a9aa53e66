//! Identifier newtypes for markets, tokens, conditions and venue orders.
//!
//! All identifiers are opaque venue-assigned strings; newtypes keep them
//! from being mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Truncated form for log lines (market ids are long hex strings).
            pub fn short(&self) -> &str {
                let mut end = self.0.len().min(16);
                while !self.0.is_char_boundary(end) {
                    end -= 1;
                }
                &self.0[..end]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a binary market.
    MarketId
);
string_id!(
    /// Identifier for one outcome token (YES or NO leg) of a market.
    TokenId
);
string_id!(
    /// Condition identifier used for on-chain split/merge bookkeeping.
    ConditionId
);
string_id!(
    /// Venue-assigned order identifier.
    OrderId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_truncates() {
        let id = MarketId::new("0x1234567890abcdef1234");
        assert_eq!(id.short(), "0x1234567890abcd");
    }

    #[test]
    fn test_short_handles_short_ids() {
        let id = TokenId::new("tok1");
        assert_eq!(id.short(), "tok1");
    }

    #[test]
    fn test_short_respects_char_boundaries() {
        // 15 ASCII bytes followed by a multi-byte char straddling byte 16.
        let id = MarketId::new("123456789012345éxyz");
        assert_eq!(id.short(), "123456789012345");
    }

    #[test]
    fn test_ids_are_distinct_types() {
        let m = MarketId::new("a");
        let t = TokenId::new("a");
        assert_eq!(m.as_str(), t.as_str());
    }
}
