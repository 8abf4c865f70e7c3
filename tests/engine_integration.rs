//! Integration tests for the metrics engine.
//!
//! These tests drive the full pipeline — paging, classification,
//! aggregation, and rendering — through the public API against an
//! in-memory conversation source. Each service module contains its own
//! unit tests for detailed logic testing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use tally::config::{DomainAllowlist, PAGE_SIZE};
use tally::domain::{Address, Conversation, ConversationId, Message, TeamId};
use tally::providers::inbox::{ApiError, ConversationQuery, ConversationSource, Result};
use tally::services::{render_team_report, MetricsAggregator, MetricsError, MetricsRequest};

// ============================================================================
// Test Fixtures
// ============================================================================

// 2024-06-15T00:00:00Z
const DAY: i64 = 1_718_409_600;

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

struct PagedSource {
    pages: std::sync::Mutex<Vec<Vec<Conversation>>>,
    messages: HashMap<String, Vec<Message>>,
}

impl PagedSource {
    fn new(pages: Vec<Vec<Conversation>>) -> Self {
        Self {
            pages: std::sync::Mutex::new(pages),
            messages: HashMap::new(),
        }
    }

    fn with_messages(mut self, id: &str, messages: Vec<Message>) -> Self {
        self.messages.insert(id.to_string(), messages);
        self
    }
}

#[async_trait::async_trait]
impl ConversationSource for PagedSource {
    async fn list_conversations(&self, _query: &ConversationQuery) -> Result<Vec<Conversation>> {
        let mut pages = self.pages.lock().unwrap();
        if pages.is_empty() {
            Ok(vec![])
        } else {
            Ok(pages.remove(0))
        }
    }

    async fn conversation_messages(
        &self,
        conversation: &ConversationId,
        _limit: usize,
    ) -> Result<Vec<Message>> {
        match self.messages.get(&conversation.0) {
            Some(messages) => Ok(messages.clone()),
            None => Err(ApiError::NotFound(conversation.0.clone())),
        }
    }
}

fn conv(id: &str, offset_secs: i64) -> Conversation {
    Conversation {
        id: ConversationId::from(id),
        created_at: at(DAY + offset_secs),
        last_activity_at: at(DAY + offset_secs),
    }
}

fn message(from: &str, to: &str, offset_secs: i64) -> Message {
    Message {
        from_field: Some(Address::new(from)),
        to_fields: vec![Address::new(to)],
        delivered_at: Some(at(DAY + offset_secs)),
    }
}

fn request() -> MetricsRequest {
    let mut req = MetricsRequest::new(TeamId::from("team-1"), "2024-06-01", "2024-06-30");
    req.internal_domains = Some(DomainAllowlist::new(["example.com"]));
    req
}

// ============================================================================
// End-to-End Pipeline Tests
// ============================================================================

#[tokio::test]
async fn full_run_pages_classifies_and_renders() {
    // Two full pages and one short page, every conversation inside the
    // window; the second conversation has a measurable first reply.
    let mut page_one: Vec<Conversation> =
        (0..PAGE_SIZE).map(|i| conv(&format!("a{}", i), -(i as i64))).collect();
    let replying = conv("reply", -2_000);
    page_one[10] = replying.clone();
    let page_two: Vec<Conversation> =
        (0..10).map(|i| conv(&format!("b{}", i), -(3_000 + i as i64))).collect();

    let mut source = PagedSource::new(vec![page_one.clone(), page_two.clone()]);
    for c in page_one.iter().chain(page_two.iter()) {
        if c.id.0 == "reply" {
            continue;
        }
        source = source.with_messages(
            &c.id.0,
            vec![message("customer@elsewhere.net", "help@example.com", 0)],
        );
    }
    let source = source.with_messages(
        "reply",
        vec![
            message("customer@elsewhere.net", "help@example.com", 0),
            message("help@example.com", "customer@elsewhere.net", 300),
        ],
    );

    let aggregator = MetricsAggregator::new(source, DomainAllowlist::default(), None);
    let report = aggregator.aggregate(&request()).await.unwrap();

    assert_eq!(report.metrics.total_conversations, (PAGE_SIZE + 10) as u64);
    assert_eq!(report.metrics.conversations_with_reply, 1);
    assert_eq!(report.metrics.reply_latencies, vec![300.0]);
    assert_eq!(report.metrics.total_outbound, 1);
    assert_eq!(
        report.metrics.total_inbound,
        (PAGE_SIZE + 10) as u64
    );
    assert_eq!(
        report.metrics.inbound_by_channel.get("help@example.com"),
        Some(&((PAGE_SIZE + 10) as u64))
    );

    let rendered = render_team_report(&report);
    assert!(rendered.contains("Team metrics: team-1"));
    assert!(rendered.contains("Conversations with a reply: 1"));
    assert!(rendered.contains("Average first reply: 5m"));
}

#[tokio::test]
async fn missing_conversations_are_skipped_not_fatal() {
    // "ghost" has no canned messages, so its fetch returns NotFound.
    let source = PagedSource::new(vec![vec![conv("ok", 0), conv("ghost", -10)]]).with_messages(
        "ok",
        vec![message("customer@elsewhere.net", "help@example.com", 0)],
    );

    let aggregator = MetricsAggregator::new(source, DomainAllowlist::default(), None);
    let report = aggregator.aggregate(&request()).await.unwrap();

    assert_eq!(report.metrics.total_conversations, 1);
    assert_eq!(report.metrics.conversations_skipped, 1);
    assert_eq!(report.metrics.total_inbound, 1);
}

#[tokio::test]
async fn empty_window_renders_all_zero_report() {
    let source = PagedSource::new(vec![]);
    let aggregator = MetricsAggregator::new(source, DomainAllowlist::default(), None);

    let report = aggregator.aggregate(&request()).await.unwrap();

    assert_eq!(report.metrics.total_conversations, 0);
    assert!(report.latency.is_none());

    let rendered = render_team_report(&report);
    assert!(rendered.contains("Conversations analyzed: 0"));
    assert!(!rendered.contains("Reply time distribution"));
}

#[tokio::test]
async fn cancellation_before_listing_makes_no_calls() {
    let source = PagedSource::new(vec![vec![conv("c", 0)]]);
    let aggregator = MetricsAggregator::new(source, DomainAllowlist::default(), None);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = aggregator.aggregate_with_cancel(&request(), &cancel).await;
    assert!(matches!(result, Err(MetricsError::Cancelled)));
}
