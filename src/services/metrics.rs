//! Team metrics aggregation.
//!
//! The [`MetricsAggregator`] orchestrates a whole run: page the team's
//! conversations, fetch and classify each conversation's messages, and
//! fold the per-conversation results into run-wide totals and a latency
//! distribution. Conversation-level message-fetch failures are expected
//! under load and skip the conversation; listing failures abort the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use super::classifier::{classify, ChannelDeltas, ConversationOutcome};
use super::pager::{ConversationPager, PageError};
use crate::config::{ChannelFilter, DomainAllowlist, MAX_CONVERSATION_CAP, MESSAGE_LIMIT};
use crate::domain::{DateRange, TeamId};
use crate::providers::inbox::{ApiError, ConversationSource};

/// Default per-run conversation cap when the caller does not set one.
pub const DEFAULT_CONVERSATION_CAP: usize = 200;

/// Fixed latency distribution buckets, in seconds.
///
/// Upper bounds are exclusive; the final bucket is open-ended.
const BUCKET_BOUNDS: [i64; 5] = [900, 3_600, 14_400, 43_200, 172_800];
const BUCKET_LABELS: [&str; 6] = [
    "under 15m",
    "15m to 1h",
    "1h to 4h",
    "4h to 12h",
    "12h to 48h",
    "over 48h",
];

/// Errors that abort a metrics run.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Bad caller input (dates, cap). No network call is made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The upstream rejected the bearer token.
    #[error("authentication failed: invalid or missing API token")]
    Auth,

    /// Conversation listing failed. The candidate set is incomplete, so
    /// partial results are never reported.
    #[error("conversation listing failed: {0}")]
    Listing(#[source] ApiError),

    /// The run was cancelled between fetches.
    #[error("run cancelled")]
    Cancelled,
}

/// Caller-facing request for one metrics run.
#[derive(Debug, Clone)]
pub struct MetricsRequest {
    /// Team to aggregate.
    pub team: TeamId,
    /// Start date, `YYYY-MM-DD`.
    pub start_date: String,
    /// End date, `YYYY-MM-DD`.
    pub end_date: String,
    /// Override for the configured internal-domain allowlist.
    pub internal_domains: Option<DomainAllowlist>,
    /// Override for the configured channel filter.
    pub tracked_channels: Option<ChannelFilter>,
    /// Maximum conversations to aggregate (1..=1000).
    pub max_conversations: Option<usize>,
}

impl MetricsRequest {
    /// Creates a request with defaults for everything but the window.
    pub fn new(team: TeamId, start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            team,
            start_date: start_date.into(),
            end_date: end_date.into(),
            internal_domains: None,
            tracked_channels: None,
            max_conversations: None,
        }
    }
}

/// Run-wide accumulator, created fresh per invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    /// Conversations successfully fetched and classified.
    pub total_conversations: u64,
    /// In-range inbound messages across all conversations.
    pub total_inbound: u64,
    /// In-range outbound messages across all conversations.
    pub total_outbound: u64,
    /// Conversations with a measured first reply.
    ///
    /// Invariant: equals `reply_latencies.len()` and never exceeds
    /// `total_conversations`.
    pub conversations_with_reply: u64,
    /// Conversations dropped because their message fetch failed.
    pub conversations_skipped: u64,
    /// First-reply latencies in seconds, in conversation order.
    pub reply_latencies: Vec<f64>,
    /// Inbound message counts per internal recipient channel.
    pub inbound_by_channel: HashMap<String, u64>,
    /// Outbound message counts per sender channel.
    pub outbound_by_channel: HashMap<String, u64>,
}

impl RunMetrics {
    fn fold(&mut self, outcome: ConversationOutcome, deltas: ChannelDeltas) {
        self.total_conversations += 1;
        self.total_inbound += deltas.inbound;
        self.total_outbound += deltas.outbound;
        for (channel, count) in deltas.inbound_by_channel {
            *self.inbound_by_channel.entry(channel).or_default() += count;
        }
        for (channel, count) in deltas.outbound_by_channel {
            *self.outbound_by_channel.entry(channel).or_default() += count;
        }
        if let Some(latency) = outcome.reply_latency_secs {
            self.conversations_with_reply += 1;
            self.reply_latencies.push(latency);
        }
    }
}

/// One latency distribution bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatencyBucket {
    /// Human-readable bucket label.
    pub label: &'static str,
    /// Latencies falling in this bucket.
    pub count: u64,
    /// Floor-divided percentage of the whole distribution.
    pub percent: u64,
}

/// Derived latency statistics, computed once after aggregation over the
/// full latency list (never incrementally).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    /// Mean first-reply latency in seconds.
    pub mean_secs: f64,
    /// Fixed-threshold distribution buckets. Counts sum to the number of
    /// recorded latencies.
    pub buckets: Vec<LatencyBucket>,
}

impl LatencySummary {
    /// Summarizes a latency list; `None` when it is empty.
    pub fn from_latencies(latencies: &[f64]) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }

        let total = latencies.len() as u64;
        let mut counts = [0u64; BUCKET_LABELS.len()];
        for &latency in latencies {
            counts[bucket_index(latency)] += 1;
        }

        let buckets = BUCKET_LABELS
            .iter()
            .zip(counts.iter())
            .map(|(&label, &count)| LatencyBucket {
                label,
                count,
                percent: count * 100 / total,
            })
            .collect();

        let mean_secs = latencies.iter().sum::<f64>() / latencies.len() as f64;
        Some(Self { mean_secs, buckets })
    }
}

fn bucket_index(latency_secs: f64) -> usize {
    BUCKET_BOUNDS
        .iter()
        .position(|&bound| latency_secs < bound as f64)
        .unwrap_or(BUCKET_BOUNDS.len())
}

/// Finished report for one metrics run.
#[derive(Debug, Clone, Serialize)]
pub struct TeamReport {
    /// Team the run covered.
    pub team: TeamId,
    /// Aggregation window.
    pub range: DateRange,
    /// Run-wide totals and channel breakdowns.
    pub metrics: RunMetrics,
    /// Latency statistics; absent when no replies were measured.
    pub latency: Option<LatencySummary>,
    /// When this report was generated.
    pub generated_at: DateTime<Utc>,
}

/// Aggregates team reply metrics over a [`ConversationSource`].
///
/// Runs are strictly sequential: one conversation page, then one
/// conversation's messages at a time, because every call shares the
/// source's rate-limited channel to the upstream.
pub struct MetricsAggregator<S: ConversationSource> {
    source: S,
    internal_domains: DomainAllowlist,
    tracked_channels: Option<ChannelFilter>,
}

impl<S: ConversationSource> MetricsAggregator<S> {
    /// Creates an aggregator with configured classification defaults.
    ///
    /// Per-request overrides on [`MetricsRequest`] take precedence over
    /// these defaults.
    pub fn new(
        source: S,
        internal_domains: DomainAllowlist,
        tracked_channels: Option<ChannelFilter>,
    ) -> Self {
        Self {
            source,
            internal_domains,
            tracked_channels,
        }
    }

    /// Runs a full aggregation without external cancellation.
    pub async fn aggregate(&self, request: &MetricsRequest) -> Result<TeamReport, MetricsError> {
        self.aggregate_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Runs a full aggregation, checking `cancel` at every fetch boundary.
    pub async fn aggregate_with_cancel(
        &self,
        request: &MetricsRequest,
        cancel: &CancellationToken,
    ) -> Result<TeamReport, MetricsError> {
        let range = DateRange::from_dates(&request.start_date, &request.end_date)
            .map_err(MetricsError::InvalidInput)?;

        let cap = request.max_conversations.unwrap_or(DEFAULT_CONVERSATION_CAP);
        if cap == 0 || cap > MAX_CONVERSATION_CAP {
            return Err(MetricsError::InvalidInput(format!(
                "max_conversations must be between 1 and {}, got {}",
                MAX_CONVERSATION_CAP, cap
            )));
        }

        let internal_domains = request
            .internal_domains
            .as_ref()
            .unwrap_or(&self.internal_domains);
        let tracked_channels = request
            .tracked_channels
            .as_ref()
            .or(self.tracked_channels.as_ref());

        tracing::info!(team = %request.team, start = %range.start(), end = %range.end(), cap, "starting metrics run");

        let pager = ConversationPager::new(&self.source);
        let conversations = pager
            .page(&request.team, &range, cap, cancel)
            .await
            .map_err(|e| match e {
                PageError::Cancelled => MetricsError::Cancelled,
                PageError::Api(ApiError::Unauthorized) => MetricsError::Auth,
                PageError::Api(api) => MetricsError::Listing(api),
            })?;

        let mut metrics = RunMetrics::default();

        for conversation in &conversations {
            if cancel.is_cancelled() {
                return Err(MetricsError::Cancelled);
            }

            match self
                .source
                .conversation_messages(&conversation.id, MESSAGE_LIMIT)
                .await
            {
                Ok(messages) => {
                    let (outcome, deltas) =
                        classify(&messages, &range, internal_domains, tracked_channels);
                    metrics.fold(outcome, deltas);
                }
                // A dead token will fail every remaining fetch too.
                Err(ApiError::Unauthorized) => return Err(MetricsError::Auth),
                Err(e) => {
                    tracing::warn!(
                        conversation = %conversation.id,
                        error = %e,
                        "message fetch failed, skipping conversation"
                    );
                    metrics.conversations_skipped += 1;
                }
            }
        }

        let latency = LatencySummary::from_latencies(&metrics.reply_latencies);

        tracing::info!(
            team = %request.team,
            conversations = metrics.total_conversations,
            skipped = metrics.conversations_skipped,
            replies = metrics.conversations_with_reply,
            "metrics run complete"
        );

        Ok(TeamReport {
            team: request.team.clone(),
            range,
            metrics,
            latency,
            generated_at: Utc::now(),
        })
    }
}
