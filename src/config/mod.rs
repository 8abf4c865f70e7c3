//! Configuration and settings management.
//!
//! Run configuration is resolved at the process boundary into an explicit
//! [`Settings`] value and passed into the engine by value.

mod settings;

pub use settings::{
    ChannelFilter, DomainAllowlist, Settings, API_TOKEN_ENV, DEFAULT_REQUEST_INTERVAL,
    INTERNAL_DOMAINS_ENV, MAX_CONVERSATION_CAP, MESSAGE_LIMIT, PAGE_SIZE, TRACKED_CHANNELS_ENV,
};
