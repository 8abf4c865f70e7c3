//! Service layer: the metrics engine and report workflows.
//!
//! Services are generic over the provider traits so tests can drive
//! them with in-memory sources. The pipeline runs pager, then
//! classifier, then aggregation, with rendering kept pure at the end.

mod analytics;
mod classifier;
mod metrics;
mod pager;
mod report;

pub use analytics::AnalyticsService;
pub use classifier::{classify, ChannelDeltas, ConversationOutcome};
pub use metrics::{
    LatencyBucket, LatencySummary, MetricsAggregator, MetricsError, MetricsRequest, RunMetrics,
    TeamReport, DEFAULT_CONVERSATION_CAP,
};
pub use pager::{ConversationPager, PageError};
pub use report::{render_analytics_report, render_team_report};
