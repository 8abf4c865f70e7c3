//! Upstream inbox API trait definition.
//!
//! This module defines the [`ConversationSource`] and [`AnalyticsSource`]
//! traits which abstract over the shared-inbox HTTP API. The metrics
//! engine only ever talks to these traits, so tests can drive it with
//! synthetic feeds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Conversation, ConversationId, Message, OrganizationId, ReportId, TeamId};

/// Result type alias for upstream API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors surfaced by the upstream API client.
///
/// There is no retry anywhere; callers decide whether a failure is fatal
/// for the run or recoverable per conversation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bearer token missing, invalid, or expired.
    #[error("unauthorized: invalid or missing API token")]
    Unauthorized,

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-2xx HTTP status.
    #[error("upstream returned HTTP {0}")]
    Http(u16),

    /// Connection-level failure (DNS, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Request was malformed before any network call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Mailbox scope for conversation listings.
///
/// Mirrors the upstream query flags; each variant maps to a boolean query
/// parameter, with team-scoped variants for inbox/closed/all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mailbox {
    /// Open conversations in the inbox.
    Inbox,
    /// Every conversation regardless of state.
    All,
    /// Conversations assigned to someone.
    Assigned,
    /// Closed conversations.
    Closed,
    /// Flagged conversations.
    Flagged,
    /// Trashed conversations.
    Trashed,
    /// Junked conversations.
    Junked,
    /// Snoozed conversations.
    Snoozed,
}

impl Mailbox {
    /// Parses a mailbox name, rejecting unknown values.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "inbox" => Some(Self::Inbox),
            "all" => Some(Self::All),
            "assigned" => Some(Self::Assigned),
            "closed" => Some(Self::Closed),
            "flagged" => Some(Self::Flagged),
            "trashed" => Some(Self::Trashed),
            "junked" => Some(Self::Junked),
            "snoozed" => Some(Self::Snoozed),
            _ => None,
        }
    }

    /// Query flag for an unscoped listing.
    pub fn query_flag(&self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::All => "all",
            Self::Assigned => "assigned",
            Self::Closed => "closed",
            Self::Flagged => "flagged",
            Self::Trashed => "trashed",
            Self::Junked => "junked",
            Self::Snoozed => "snoozed",
        }
    }

    /// Query flag when the listing is scoped to a team.
    ///
    /// Only inbox, closed, and all have team-scoped variants upstream;
    /// the rest fall back to the unscoped flag.
    pub fn team_query_flag(&self) -> Option<&'static str> {
        match self {
            Self::Inbox => Some("team_inbox"),
            Self::Closed => Some("team_closed"),
            Self::All => Some("team_all"),
            _ => None,
        }
    }
}

/// Parameters for a single conversation listing request.
#[derive(Debug, Clone)]
pub struct ConversationQuery {
    /// Mailbox scope.
    pub mailbox: Mailbox,
    /// Team to scope the listing to, if any.
    pub team: Option<TeamId>,
    /// Maximum records per page.
    pub limit: usize,
    /// Exclusive upper bound on `last_activity_at` for cursor paging.
    pub until: Option<DateTime<Utc>>,
}

impl ConversationQuery {
    /// Builds the "all conversations for a team" query the metrics pager
    /// uses.
    pub fn team_all(team: TeamId, limit: usize) -> Self {
        Self {
            mailbox: Mailbox::All,
            team: Some(team),
            limit,
            until: None,
        }
    }

    /// Returns a copy advanced to the next page.
    pub fn with_until(&self, until: DateTime<Utc>) -> Self {
        Self {
            until: Some(until),
            ..self.clone()
        }
    }
}

/// Request body for a native analytics report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRequest {
    /// Organization to report on.
    pub organization: OrganizationId,
    /// Start date, `YYYY-MM-DD`.
    pub start_date: String,
    /// End date, `YYYY-MM-DD`.
    pub end_date: String,
    /// Optional team filter.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<String>,
    /// Optional user filter.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    /// Optional mailbox filter.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mailboxes: Vec<String>,
    /// Optional label filter.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl ReportRequest {
    /// Creates an unfiltered report request.
    pub fn new(
        organization: OrganizationId,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            organization,
            start_date: start_date.into(),
            end_date: end_date.into(),
            teams: Vec::new(),
            users: Vec::new(),
            mailboxes: Vec::new(),
            labels: Vec::new(),
        }
    }
}

/// Conversation totals inside a native analytics report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationTotals {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub new: u64,
    #[serde(default)]
    pub closed: u64,
    #[serde(default)]
    pub reopened: u64,
}

/// Message totals inside a native analytics report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageTotals {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub inbound: u64,
    #[serde(default)]
    pub outbound: u64,
}

/// Timing block inside a native analytics report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingTotals {
    #[serde(default)]
    pub average_seconds: u64,
    #[serde(default)]
    pub median_seconds: u64,
}

/// Per-team breakdown entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamBreakdown {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub conversations: u64,
    #[serde(default)]
    pub messages: u64,
}

/// Per-user breakdown entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserBreakdown {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub conversations: u64,
    #[serde(default)]
    pub messages_sent: u64,
}

/// Per-label breakdown entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelBreakdown {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub count: u64,
}

/// A native analytics report as returned by the upstream API.
///
/// The server computes these numbers; this crate only consumes and
/// renders them. Unknown sections are preserved in `extra` so the
/// renderer can fall back to a raw summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// Report identifier.
    pub id: ReportId,
    /// Processing status (`pending`, `processing`, `done`, ...).
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    /// Organization name or id; shape varies upstream.
    #[serde(default)]
    pub organization: Option<serde_json::Value>,
    #[serde(default)]
    pub conversations: Option<ConversationTotals>,
    #[serde(default)]
    pub messages: Option<MessageTotals>,
    #[serde(default)]
    pub response_time: Option<TimingTotals>,
    #[serde(default)]
    pub resolution_time: Option<TimingTotals>,
    #[serde(default)]
    pub teams: Vec<TeamBreakdown>,
    #[serde(default)]
    pub users: Vec<UserBreakdown>,
    #[serde(default)]
    pub labels: Vec<LabelBreakdown>,
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Any sections this crate does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_status() -> String {
    "unknown".to_string()
}

impl AnalyticsReport {
    /// Returns true while the upstream is still computing the report.
    pub fn is_processing(&self) -> bool {
        matches!(self.status.as_str(), "pending" | "processing")
    }
}

/// Trait for the conversation/message side of the upstream API.
///
/// Implementations pace their own requests; callers issue them strictly
/// sequentially.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    /// Lists one page of conversations.
    ///
    /// Returns records in upstream order (most recent activity first).
    /// An empty page is a valid response, not an error.
    async fn list_conversations(&self, query: &ConversationQuery) -> Result<Vec<Conversation>>;

    /// Fetches up to `limit` messages for one conversation.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the conversation does not exist.
    async fn conversation_messages(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Vec<Message>>;
}

/// Trait for the native analytics-report side of the upstream API.
#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    /// Submits an async report request; the report is computed server-side.
    async fn create_report(&self, request: &ReportRequest) -> Result<AnalyticsReport>;

    /// Fetches a previously created report by id.
    async fn fetch_report(&self, report: &ReportId) -> Result<AnalyticsReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailbox_parse_known_names() {
        assert_eq!(Mailbox::parse("inbox"), Some(Mailbox::Inbox));
        assert_eq!(Mailbox::parse("ALL"), Some(Mailbox::All));
        assert_eq!(Mailbox::parse("Snoozed"), Some(Mailbox::Snoozed));
        assert_eq!(Mailbox::parse("archive"), None);
    }

    #[test]
    fn mailbox_team_flags() {
        assert_eq!(Mailbox::Inbox.team_query_flag(), Some("team_inbox"));
        assert_eq!(Mailbox::All.team_query_flag(), Some("team_all"));
        assert_eq!(Mailbox::Closed.team_query_flag(), Some("team_closed"));
        assert_eq!(Mailbox::Flagged.team_query_flag(), None);
    }

    #[test]
    fn team_all_query_defaults() {
        let query = ConversationQuery::team_all(TeamId::from("team-1"), 50);
        assert_eq!(query.mailbox, Mailbox::All);
        assert_eq!(query.limit, 50);
        assert!(query.until.is_none());
    }

    #[test]
    fn query_with_until_preserves_scope() {
        let query = ConversationQuery::team_all(TeamId::from("team-1"), 50);
        let at = Utc::now();
        let next = query.with_until(at);
        assert_eq!(next.until, Some(at));
        assert_eq!(next.team, Some(TeamId::from("team-1")));
    }

    #[test]
    fn report_request_skips_empty_filters() {
        let request = ReportRequest::new(OrganizationId::from("org-1"), "2024-06-01", "2024-06-30");
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("teams"));
        assert!(!json.contains("mailboxes"));
        assert!(json.contains("\"organization\":\"org-1\""));
    }

    #[test]
    fn analytics_report_processing_states() {
        let mut report: AnalyticsReport =
            serde_json::from_str(r#"{"id":"r-1","status":"pending"}"#).unwrap();
        assert!(report.is_processing());
        report.status = "done".to_string();
        assert!(!report.is_processing());
    }

    #[test]
    fn analytics_report_captures_unknown_sections() {
        let report: AnalyticsReport = serde_json::from_str(
            r#"{"id":"r-1","status":"done","custom_metric":42,"messages":{"total":10,"inbound":6,"outbound":4}}"#,
        )
        .unwrap();
        assert_eq!(report.extra.get("custom_metric").and_then(|v| v.as_u64()), Some(42));
        assert_eq!(report.messages.as_ref().unwrap().inbound, 6);
    }

    #[test]
    fn api_error_display() {
        assert!(ApiError::Unauthorized.to_string().contains("unauthorized"));
        assert!(ApiError::Http(503).to_string().contains("503"));
        assert!(ApiError::NotFound("conv-1".into()).to_string().contains("conv-1"));
    }
}
