//! Order state machine.
//!
//! Every venue order moves through an explicit state machine validated by an
//! adjacency table. `Filled` is the only fully terminal state; `Cancelled`
//! may still transition to `Filled` because a fill can race a cancel on the
//! venue side. Invalid transitions surface as a typed error that callers log
//! and ignore; they are never fatal.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Order side on the venue book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle state of a single venue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderState {
    /// Submitted, not yet confirmed resting.
    New,
    /// Confirmed resting on the book.
    Live,
    /// Partially filled, remainder still resting.
    Partial,
    /// Completely filled (terminal).
    Filled,
    /// Cancelled; a racing fill may still arrive.
    Cancelled,
    /// Venue reported a status we could not map.
    Unknown,
}

impl OrderState {
    /// True for states that can still produce a fill and need polling.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::New | Self::Live | Self::Partial)
    }

    /// True once no further transitions are expected from this side alone.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Live => write!(f, "LIVE"),
            Self::Partial => write!(f, "PARTIAL"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Attempted transition rejected by the adjacency table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order state transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: OrderState,
    pub to: OrderState,
}

/// Adjacency table for the order state machine.
///
/// `Cancelled -> Filled` is deliberately allowed: the venue can match an
/// order after the cancel request was issued but before it took effect.
pub fn can_transition(current: OrderState, target: OrderState) -> bool {
    use OrderState::*;
    match current {
        New => matches!(target, Live | Filled | Cancelled | Unknown),
        Live => matches!(target, Partial | Filled | Cancelled | Unknown),
        Partial => matches!(target, Filled | Cancelled | Unknown),
        Filled => false,
        Cancelled => matches!(target, Filled),
        Unknown => matches!(target, Live | Partial | Filled | Cancelled),
    }
}

/// Map a venue status string to an `OrderState`.
///
/// Unrecognized statuses map to `Unknown` rather than failing; the state
/// machine recovers from `Unknown` on the next successful poll.
pub fn parse_venue_status(status: &str) -> OrderState {
    match status.trim().to_ascii_uppercase().as_str() {
        "LIVE" | "ACTIVE" | "OPEN" => OrderState::Live,
        "MATCHED" | "FILLED" => OrderState::Filled,
        "CANCELLED" | "CANCELED" | "EXPIRED" => OrderState::Cancelled,
        _ => OrderState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderState::*;

    #[test]
    fn test_filled_is_terminal() {
        for target in [New, Live, Partial, Cancelled, Unknown, Filled] {
            assert!(!can_transition(Filled, target));
        }
    }

    #[test]
    fn test_cancelled_accepts_racing_fill() {
        assert!(can_transition(Cancelled, Filled));
        assert!(!can_transition(Cancelled, Live));
        assert!(!can_transition(Cancelled, Partial));
    }

    #[test]
    fn test_new_transitions() {
        assert!(can_transition(New, Live));
        assert!(can_transition(New, Filled));
        assert!(can_transition(New, Cancelled));
        assert!(can_transition(New, Unknown));
        assert!(!can_transition(New, Partial));
    }

    #[test]
    fn test_unknown_recovers() {
        assert!(can_transition(Unknown, Live));
        assert!(can_transition(Unknown, Partial));
        assert!(can_transition(Unknown, Filled));
        assert!(can_transition(Unknown, Cancelled));
    }

    #[test]
    fn test_parse_venue_status() {
        assert_eq!(parse_venue_status("LIVE"), Live);
        assert_eq!(parse_venue_status("active"), Live);
        assert_eq!(parse_venue_status(" OPEN "), Live);
        assert_eq!(parse_venue_status("MATCHED"), Filled);
        assert_eq!(parse_venue_status("filled"), Filled);
        assert_eq!(parse_venue_status("CANCELED"), Cancelled);
        assert_eq!(parse_venue_status("EXPIRED"), Cancelled);
        assert_eq!(parse_venue_status("DELAYED"), Unknown);
    }

    #[test]
    fn test_is_open() {
        assert!(New.is_open());
        assert!(Live.is_open());
        assert!(Partial.is_open());
        assert!(!Filled.is_open());
        assert!(!Cancelled.is_open());
        assert!(!Unknown.is_open());
    }
}
