//! Run configuration types.
//!
//! Configuration is resolved once at the process boundary (flags or
//! environment variables) into an explicit [`Settings`] value and passed
//! into the engine. The core never reads process-wide state directly.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Environment variable holding the upstream bearer token.
pub const API_TOKEN_ENV: &str = "MISSIVE_API_TOKEN";
/// Environment variable with comma-separated internal domains.
pub const INTERNAL_DOMAINS_ENV: &str = "INTERNAL_DOMAINS";
/// Environment variable with comma-separated tracked channel addresses.
pub const TRACKED_CHANNELS_ENV: &str = "TRACKED_CHANNELS";

/// Default minimum delay between upstream calls.
///
/// The upstream documents a 5 req/s burst limit; pacing at 2 req/s keeps
/// a comfortable margin under it.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(500);

/// Conversations fetched per listing page.
pub const PAGE_SIZE: usize = 50;

/// Upstream cap on messages returned per conversation request.
pub const MESSAGE_LIMIT: usize = 10;

/// Bounds on the per-run conversation cap.
pub const MAX_CONVERSATION_CAP: usize = 1000;

/// Domains considered "internal" for inbound/outbound classification.
///
/// Entries are lowercase domain substrings. An email address is internal
/// when the part after its last `@` contains any entry. Constructed once
/// per run, read-only thereafter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAllowlist {
    domains: Vec<String>,
}

impl DomainAllowlist {
    /// Builds an allowlist from domain strings, lowercasing and dropping
    /// empty entries.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Parses a comma-separated list, e.g. from `INTERNAL_DOMAINS`.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    /// Returns true if no domains are configured.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Returns true if `address` belongs to an internal domain.
    ///
    /// Addresses without an `@` never match.
    pub fn matches(&self, address: &str) -> bool {
        let address = address.to_lowercase();
        let Some(domain) = address.rsplit('@').next().filter(|_| address.contains('@')) else {
            return false;
        };
        self.domains.iter().any(|d| domain.contains(d.as_str()))
    }
}

/// Optional restriction of channel breakdowns to specific addresses.
///
/// When absent, every address seen during a run is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFilter {
    addresses: HashSet<String>,
}

impl ChannelFilter {
    /// Builds a filter from address strings, lowercased.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            addresses: addresses
                .into_iter()
                .map(|a| a.as_ref().trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    /// Parses a comma-separated list, e.g. from `TRACKED_CHANNELS`.
    ///
    /// Returns `None` for an all-whitespace input so an empty env var
    /// keeps the "track everything" default.
    pub fn from_csv(csv: &str) -> Option<Self> {
        let filter = Self::new(csv.split(','));
        if filter.addresses.is_empty() {
            None
        } else {
            Some(filter)
        }
    }

    /// Returns true if `address` should be counted.
    pub fn allows(&self, address: &str) -> bool {
        self.addresses.contains(&address.to_lowercase())
    }
}

/// Resolved run configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the upstream API.
    pub api_base_url: String,
    /// Bearer token for the upstream API.
    pub api_token: String,
    /// Minimum delay between successive upstream calls.
    pub request_interval: Duration,
    /// Internal-domain allowlist for message classification.
    pub internal_domains: DomainAllowlist,
    /// Optional channel restriction for breakdowns.
    pub tracked_channels: Option<ChannelFilter>,
}

impl Settings {
    /// Default upstream API base.
    pub const DEFAULT_API_BASE: &'static str = "https://public.missiveapp.com/v1";

    /// Creates settings with defaults around the given token.
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE.to_string(),
            api_token: api_token.into(),
            request_interval: DEFAULT_REQUEST_INTERVAL,
            internal_domains: DomainAllowlist::default(),
            tracked_channels: None,
        }
    }

    /// Resolves settings from the process environment.
    ///
    /// Reads the bearer token from `MISSIVE_API_TOKEN` and the optional
    /// classification fallbacks from `INTERNAL_DOMAINS` and
    /// `TRACKED_CHANNELS`. This is the only place the crate touches
    /// environment state.
    pub fn from_env() -> Result<Self, String> {
        let token = std::env::var(API_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| format!("{} not set in environment", API_TOKEN_ENV))?;

        let mut settings = Self::new(token);

        if let Ok(domains) = std::env::var(INTERNAL_DOMAINS_ENV) {
            settings.internal_domains = DomainAllowlist::from_csv(&domains);
        }
        if let Ok(channels) = std::env::var(TRACKED_CHANNELS_ENV) {
            settings.tracked_channels = ChannelFilter::from_csv(&channels);
        }

        Ok(settings)
    }
}
