//! Conversation pager for team metrics runs.
//!
//! Walks the cursor-paginated conversation listing for a team, applying
//! the client-side date-range filter and stopping rules, and returns an
//! eager list (the termination rule needs a full scan of each page).

use tokio_util::sync::CancellationToken;

use crate::config::PAGE_SIZE;
use crate::domain::{Conversation, DateRange, TeamId};
use crate::providers::inbox::{ApiError, ConversationQuery, ConversationSource};

/// Errors from a paging pass.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The run was cancelled between page fetches.
    #[error("run cancelled")]
    Cancelled,

    /// A page fetch failed. Listing failures are fatal for the whole run
    /// because the candidate set would be incomplete.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Pages through a team's conversation feed, newest activity first.
pub struct ConversationPager<'a, S: ConversationSource + ?Sized> {
    source: &'a S,
    page_size: usize,
}

impl<'a, S: ConversationSource + ?Sized> ConversationPager<'a, S> {
    /// Creates a pager over the given source with the standard page size.
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            page_size: PAGE_SIZE,
        }
    }

    #[cfg(test)]
    fn with_page_size(source: &'a S, page_size: usize) -> Self {
        Self { source, page_size }
    }

    /// Collects up to `cap` conversations for `team` within `range`.
    ///
    /// A conversation is retained when its `last_activity_at` or
    /// `created_at` is at or after the range start, and its `created_at`
    /// is at or before the range end. Paging stops when the cap is hit, a
    /// page comes back empty or short, or the oldest activity in a page
    /// precedes the range start (the feed is ordered by recency, so
    /// everything further back is out of window).
    ///
    /// Zero retained conversations is a valid, non-error outcome.
    pub async fn page(
        &self,
        team: &TeamId,
        range: &DateRange,
        cap: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Conversation>, PageError> {
        let mut retained: Vec<Conversation> = Vec::new();
        let mut query = ConversationQuery::team_all(team.clone(), self.page_size);

        loop {
            if cancel.is_cancelled() {
                return Err(PageError::Cancelled);
            }

            let page = self.source.list_conversations(&query).await?;
            if page.is_empty() {
                break;
            }

            let short_page = page.len() < self.page_size;
            let oldest_activity = page.iter().map(|c| c.last_activity_at).min();
            let cursor = page.last().map(|c| c.last_activity_at);

            for conv in page {
                if retained.len() >= cap {
                    break;
                }
                if self.in_window(&conv, range) {
                    retained.push(conv);
                }
            }

            if retained.len() >= cap {
                tracing::debug!(cap, "conversation cap reached, stopping pagination");
                break;
            }
            if short_page {
                break;
            }
            if let Some(oldest) = oldest_activity {
                if oldest < range.start() {
                    tracing::debug!(
                        oldest = %oldest,
                        start = %range.start(),
                        "paged past the window start, stopping pagination"
                    );
                    break;
                }
            }

            match cursor {
                Some(until) => query = query.with_until(until),
                None => break,
            }
        }

        Ok(retained)
    }

    /// Client-side retention filter.
    ///
    /// Retention can keep a conversation by `created_at` that the stop
    /// rule (which only looks at `last_activity_at`) would page past.
    /// That asymmetry matches the upstream consumer this was built
    /// against; see DESIGN.md before changing it.
    fn in_window(&self, conv: &Conversation, range: &DateRange) -> bool {
        (conv.last_activity_at >= range.start() || conv.created_at >= range.start())
            && conv.created_at <= range.end()
    }
}
