//! Quote proposal pipeline for the outcome market-making bot.
//!
//! A `QuoteProposal` starts as a single-level bid/ask and flows through
//! an ordered chain of pure transform stages: multi-level laddering,
//! volatility widening, event-risk widening, budget capping and the
//! post-only clamp. Stages pass the proposal by value so deployments can
//! reorder or skip them; the post-only clamp must run last.

pub mod proposal;
pub mod stages;

pub use proposal::{OrderProposal, QuoteProposal};
pub use stages::{
    apply_budget_constraint, apply_event_risk, apply_multi_level, apply_post_only_filter,
    apply_vol_adjustment, create_base_proposal,
};
