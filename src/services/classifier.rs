//! Message direction classification and first-reply detection.
//!
//! Given one conversation's messages, decides inbound vs. outbound per
//! message using the internal-domain allowlist, accumulates per-channel
//! counts, and finds the first-reply latency. Pure: the caller merges the
//! returned deltas into its run-wide accumulator.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::config::{ChannelFilter, DomainAllowlist};
use crate::domain::{DateRange, Message};

/// Per-conversation classification outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationOutcome {
    /// Delivery time of the first inbound message, if any.
    pub first_inbound_at: Option<DateTime<Utc>>,
    /// Delivery time of the first outbound message seen after an inbound
    /// one. An outbound message before any inbound is not a reply.
    pub first_outbound_after_inbound_at: Option<DateTime<Utc>>,
    /// First-reply latency in seconds. Present only when both endpoints
    /// exist and the difference is strictly positive; clock skew or bad
    /// data must not feed the distribution.
    pub reply_latency_secs: Option<f64>,
}

/// Message and channel counts for one conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelDeltas {
    /// In-range inbound message count.
    pub inbound: u64,
    /// In-range outbound message count.
    pub outbound: u64,
    /// Inbound counts keyed by the internal recipient address.
    pub inbound_by_channel: HashMap<String, u64>,
    /// Outbound counts keyed by the sender address.
    pub outbound_by_channel: HashMap<String, u64>,
}

/// Classifies one conversation's messages.
///
/// Messages outside `range` (or without a delivery time) drop out; the
/// remainder is walked in stable ascending `delivered_at` order. A sender
/// on the allowlist makes a message outbound, anything else - including a
/// missing or malformed sender - is inbound.
///
/// Channel attribution: outbound messages count against the sender (the
/// channel that replied); inbound messages count against every internal
/// recipient (the channels that received it). When `filter` is set, only
/// listed addresses are counted.
pub fn classify(
    messages: &[Message],
    range: &DateRange,
    internal_domains: &DomainAllowlist,
    filter: Option<&ChannelFilter>,
) -> (ConversationOutcome, ChannelDeltas) {
    let mut in_range: Vec<&Message> = messages
        .iter()
        .filter(|m| m.delivered_at.is_some_and(|d| range.contains(d)))
        .collect();
    // Stable sort keeps original order for identical timestamps.
    in_range.sort_by_key(|m| m.delivered_at);

    let mut outcome = ConversationOutcome::default();
    let mut deltas = ChannelDeltas::default();

    for message in in_range {
        let Some(delivered_at) = message.delivered_at else {
            continue;
        };
        let sender = message.sender_address().to_lowercase();

        if internal_domains.matches(&sender) {
            deltas.outbound += 1;
            if tracked(filter, &sender) {
                *deltas.outbound_by_channel.entry(sender).or_default() += 1;
            }
            if outcome.first_inbound_at.is_some()
                && outcome.first_outbound_after_inbound_at.is_none()
            {
                outcome.first_outbound_after_inbound_at = Some(delivered_at);
            }
        } else {
            deltas.inbound += 1;
            if outcome.first_inbound_at.is_none() {
                outcome.first_inbound_at = Some(delivered_at);
            }
            for recipient in &message.to_fields {
                let address = recipient.address.to_lowercase();
                if internal_domains.matches(&address) && tracked(filter, &address) {
                    *deltas.inbound_by_channel.entry(address).or_default() += 1;
                }
            }
        }
    }

    if let (Some(inbound_at), Some(outbound_at)) = (
        outcome.first_inbound_at,
        outcome.first_outbound_after_inbound_at,
    ) {
        let latency = (outbound_at - inbound_at).num_milliseconds() as f64 / 1000.0;
        if latency > 0.0 {
            outcome.reply_latency_secs = Some(latency);
        }
    }

    (outcome, deltas)
}

fn tracked(filter: Option<&ChannelFilter>, address: &str) -> bool {
    filter.map_or(true, |f| f.allows(address))
}
