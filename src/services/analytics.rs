//! Native analytics report workflow.
//!
//! The upstream computes these reports asynchronously: a create call
//! returns a report id, and the caller polls by id until the status
//! leaves `pending`/`processing`. This service validates inputs before
//! touching the network and leaves rendering to [`super::report`].

use crate::domain::{DateRange, OrganizationId, ReportId};
use crate::providers::inbox::{AnalyticsReport, AnalyticsSource, ApiError, ReportRequest};
use crate::services::metrics::MetricsError;

/// Drives the create/fetch report workflow over an [`AnalyticsSource`].
pub struct AnalyticsService<S: AnalyticsSource> {
    source: S,
}

impl<S: AnalyticsSource> AnalyticsService<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Submits a new report request.
    ///
    /// Dates must be `YYYY-MM-DD` with start not after end; bad dates
    /// fail without a network call.
    pub async fn create_report(
        &self,
        organization: OrganizationId,
        start_date: &str,
        end_date: &str,
    ) -> Result<AnalyticsReport, MetricsError> {
        DateRange::from_dates(start_date, end_date).map_err(MetricsError::InvalidInput)?;

        let request = ReportRequest::new(organization, start_date, end_date);
        tracing::info!(organization = %request.organization, start = start_date, end = end_date, "creating analytics report");

        self.source
            .create_report(&request)
            .await
            .map_err(map_api_error)
    }

    /// Fetches a report by id.
    pub async fn fetch_report(&self, report: &ReportId) -> Result<AnalyticsReport, MetricsError> {
        if report.0.trim().is_empty() {
            return Err(MetricsError::InvalidInput(
                "report id must not be empty".to_string(),
            ));
        }

        self.source.fetch_report(report).await.map_err(map_api_error)
    }
}

fn map_api_error(error: ApiError) -> MetricsError {
    match error {
        ApiError::Unauthorized => MetricsError::Auth,
        other => MetricsError::Listing(other),
    }
}
