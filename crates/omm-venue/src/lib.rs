//! Venue client seam for the outcome market-making bot.
//!
//! The CLOB venue is an external collaborator: this crate defines the call
//! contract (`VenueClient`) the rest of the system is written against, plus
//! a scripted `MockVenue` used throughout the test suites.
//!
//! Expected venue-level rejections (post-only would cross, insufficient
//! balance) come back as typed `VenueError` values, never panics; callers
//! treat them as "skip this side this cycle".

pub mod client;
pub mod mock;

pub use client::{OrderArgs, OrderKind, OrderStatusReport, VenueClient, VenueError, VenueResult};
pub use mock::MockVenue;
