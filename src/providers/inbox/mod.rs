//! Shared-inbox API provider.
//!
//! This module contains the upstream API traits and the Missive
//! implementation:
//!
//! - [`ConversationSource`] / [`AnalyticsSource`] - the seams the engine
//!   and tests program against
//! - [`MissiveClient`] - reqwest-backed implementation with bearer auth
//! - [`RateLimiter`] - fixed inter-call pacing shared by every request a
//!   client makes

mod missive;
mod rate_limit;
mod traits;

pub use missive::MissiveClient;
pub use rate_limit::RateLimiter;
pub use traits::{
    AnalyticsReport, AnalyticsSource, ApiError, ConversationQuery, ConversationSource,
    ConversationTotals, LabelBreakdown, Mailbox, MessageTotals, ReportRequest, Result,
    TeamBreakdown, TimingTotals, UserBreakdown,
};
