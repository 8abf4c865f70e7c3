//! Missive API client implementation.
//!
//! This module provides [`ConversationSource`] and [`AnalyticsSource`]
//! implementations over the Missive public REST API.
//!
//! # Authentication
//!
//! Missive uses a bearer token supplied by the caller through
//! [`Settings`]; resolving the token (environment, keychain, config file)
//! is the caller's concern.
//!
//! # API Usage
//!
//! - `GET conversations` with a mailbox/team scope flag for listings
//! - `GET conversations/{id}/messages` for per-conversation messages
//! - `POST analytics/reports` / `GET analytics/reports/{id}` for native
//!   server-side reports
//!
//! Every request goes through the shared [`RateLimiter`] before hitting
//! the wire; failures map into [`ApiError`] without retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use url::Url;

use super::rate_limit::RateLimiter;
use super::traits::{
    AnalyticsReport, AnalyticsSource, ApiError, ConversationQuery, ConversationSource,
    ReportRequest, Result,
};
use crate::config::Settings;
use crate::domain::{Address, Conversation, ConversationId, Message, ReportId};

/// Missive conversations list response.
#[derive(Debug, Deserialize)]
struct ConversationsResponse {
    #[serde(default)]
    conversations: Vec<WireConversation>,
}

/// Missive conversation record, narrowed to the fields the engine reads.
#[derive(Debug, Deserialize)]
struct WireConversation {
    id: String,
    /// Epoch seconds.
    created_at: Option<i64>,
    /// Epoch seconds.
    last_activity_at: Option<i64>,
}

/// Missive messages list response.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<WireMessage>,
}

/// Missive message record.
#[derive(Debug, Deserialize)]
struct WireMessage {
    from_field: Option<WireAddress>,
    #[serde(default)]
    to_fields: Vec<WireAddress>,
    /// Epoch seconds.
    delivered_at: Option<i64>,
}

/// Missive address record.
#[derive(Debug, Deserialize)]
struct WireAddress {
    address: Option<String>,
    name: Option<String>,
}

/// Analytics report creation request body.
#[derive(Debug, Serialize)]
struct CreateReportBody<'a> {
    analytics_reports: &'a ReportRequest,
}

/// Analytics report response envelope.
#[derive(Debug, Deserialize)]
struct ReportResponse {
    analytics_reports: AnalyticsReport,
}

/// Missive API client.
///
/// Holds one HTTP connection pool and one [`RateLimiter`]; all calls made
/// through the same client share the pacing state.
pub struct MissiveClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    limiter: RateLimiter,
}

impl MissiveClient {
    /// Creates a client from resolved settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        if settings.api_token.trim().is_empty() {
            return Err(ApiError::InvalidRequest("API token is empty".to_string()));
        }
        Url::parse(&settings.api_base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid base URL: {}", e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
            limiter: RateLimiter::new(settings.request_interval),
        })
    }

    /// Builds the URL for a conversation listing request.
    fn conversations_url(&self, query: &ConversationQuery) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/conversations", self.base_url))
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        {
            let mut pairs = url.query_pairs_mut();
            // Team-scoped flag takes the team id as its value; otherwise
            // the mailbox flag is a plain boolean.
            match (&query.team, query.mailbox.team_query_flag()) {
                (Some(team), Some(flag)) => {
                    pairs.append_pair(flag, &team.0);
                }
                _ => {
                    pairs.append_pair(query.mailbox.query_flag(), "true");
                }
            }
            pairs.append_pair("limit", &query.limit.to_string());
            if let Some(until) = query.until {
                pairs.append_pair("until", &until.timestamp().to_string());
            }
        }

        Ok(url)
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_token))
                .map_err(|e| ApiError::InvalidRequest(format!("invalid token header: {}", e)))?,
        );
        Ok(headers)
    }

    /// Makes a paced, authenticated GET request.
    async fn get<T: for<'de> Deserialize<'de>>(&self, url: Url) -> Result<T> {
        self.limiter.pace().await;

        let response = self
            .http
            .get(url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Self::handle_response(response).await
    }

    /// Makes a paced, authenticated POST request with a JSON body.
    async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T> {
        self.limiter.pace().await;

        let mut headers = self.auth_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 => ApiError::Unauthorized,
                404 => {
                    let body = response.text().await.unwrap_or_default();
                    ApiError::NotFound(body)
                }
                code => ApiError::Http(code),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

/// Decodes an epoch-second field, defaulting to the Unix epoch when the
/// value is absent or out of range.
fn epoch_seconds(secs: Option<i64>) -> DateTime<Utc> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn convert_conversation(wire: WireConversation) -> Conversation {
    // Missing timestamps borrow from the other field so a record never
    // sits outside every window by accident of one null.
    let created = wire.created_at.or(wire.last_activity_at);
    let activity = wire.last_activity_at.or(wire.created_at);
    Conversation {
        id: ConversationId::from(wire.id),
        created_at: epoch_seconds(created),
        last_activity_at: epoch_seconds(activity),
    }
}

fn convert_address(wire: WireAddress) -> Address {
    Address {
        address: wire.address.unwrap_or_default(),
        name: wire.name,
    }
}

fn convert_message(wire: WireMessage) -> Message {
    Message {
        from_field: wire.from_field.map(convert_address),
        to_fields: wire.to_fields.into_iter().map(convert_address).collect(),
        delivered_at: wire.delivered_at.and_then(|s| DateTime::from_timestamp(s, 0)),
    }
}

#[async_trait]
impl ConversationSource for MissiveClient {
    async fn list_conversations(&self, query: &ConversationQuery) -> Result<Vec<Conversation>> {
        let url = self.conversations_url(query)?;
        let response: ConversationsResponse = self.get(url).await?;

        tracing::debug!(
            count = response.conversations.len(),
            until = ?query.until,
            "fetched conversation page"
        );

        Ok(response
            .conversations
            .into_iter()
            .map(convert_conversation)
            .collect())
    }

    async fn conversation_messages(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let mut url = Url::parse(&format!(
            "{}/conversations/{}/messages",
            self.base_url, conversation.0
        ))
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());

        let response: MessagesResponse = self.get(url).await?;
        Ok(response.messages.into_iter().map(convert_message).collect())
    }
}

#[async_trait]
impl AnalyticsSource for MissiveClient {
    async fn create_report(&self, request: &ReportRequest) -> Result<AnalyticsReport> {
        let url = Url::parse(&format!("{}/analytics/reports", self.base_url))
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let body = CreateReportBody {
            analytics_reports: request,
        };
        let response: ReportResponse = self.post(url, &body).await?;

        tracing::info!(report_id = %response.analytics_reports.id, "analytics report created");
        Ok(response.analytics_reports)
    }

    async fn fetch_report(&self, report: &ReportId) -> Result<AnalyticsReport> {
        let url = Url::parse(&format!("{}/analytics/reports/{}", self.base_url, report.0))
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let response: ReportResponse = self.get(url).await?;
        Ok(response.analytics_reports)
    }
}
