//! Domain layer types for the tally metrics engine.
//!
//! This module contains the core domain types used throughout the crate:
//! conversations, messages, addresses, date ranges, and identifier newtypes.

mod conversation;
mod range;
mod types;

pub use conversation::{Address, Conversation, Message};
pub use range::DateRange;
pub use types::{ConversationId, OrganizationId, ReportId, TeamId};
