//! tally - CLI entry point for the team metrics reporter

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use tally::config::{ChannelFilter, DomainAllowlist, Settings};
use tally::domain::{OrganizationId, ReportId, TeamId};
use tally::providers::inbox::MissiveClient;
use tally::services::{
    render_analytics_report, render_team_report, AnalyticsService, MetricsAggregator,
    MetricsRequest,
};

#[derive(Parser)]
#[command(name = "tally", version, about = "Team reply metrics for shared mailboxes")]
struct Cli {
    /// Override the upstream API base URL
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate reply metrics for one team over a date range
    Report {
        /// Team id to aggregate
        #[arg(long)]
        team: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Comma-separated internal domains (overrides INTERNAL_DOMAINS)
        #[arg(long)]
        internal_domains: Option<String>,

        /// Comma-separated channel addresses to break down by
        #[arg(long)]
        channels: Option<String>,

        /// Maximum conversations to analyze (1-1000)
        #[arg(long)]
        max_conversations: Option<usize>,

        /// Emit the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Work with native server-computed analytics reports
    Analytics {
        #[command(subcommand)]
        action: AnalyticsAction,
    },
}

#[derive(Subcommand)]
enum AnalyticsAction {
    /// Request a new report; prints its id for later retrieval
    Create {
        /// Organization id to report on
        #[arg(long)]
        organization: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,
    },

    /// Fetch a previously created report by id
    Get {
        /// Report id from a prior create
        report_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::from_env().map_err(|e| anyhow!(e))?;
    if let Some(base) = cli.api_base {
        settings.api_base_url = base;
    }

    let client = MissiveClient::new(&settings).context("building API client")?;

    match cli.command {
        Commands::Report {
            team,
            start,
            end,
            internal_domains,
            channels,
            max_conversations,
            json,
        } => {
            let mut request = MetricsRequest::new(TeamId::from(team.as_str()), start, end);
            request.internal_domains = internal_domains.as_deref().map(DomainAllowlist::from_csv);
            request.tracked_channels = channels.as_deref().and_then(ChannelFilter::from_csv);
            request.max_conversations = max_conversations;

            let cancel = CancellationToken::new();
            let ctrl_c_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, stopping after current fetch");
                    ctrl_c_token.cancel();
                }
            });

            let aggregator = MetricsAggregator::new(
                client,
                settings.internal_domains,
                settings.tracked_channels,
            );
            let report = aggregator.aggregate_with_cancel(&request, &cancel).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_team_report(&report));
            }
        }

        Commands::Analytics { action } => {
            let service = AnalyticsService::new(client);
            match action {
                AnalyticsAction::Create {
                    organization,
                    start,
                    end,
                } => {
                    let report = service
                        .create_report(OrganizationId::from(organization.as_str()), &start, &end)
                        .await?;
                    println!("Created report {} (status: {})", report.id, report.status);
                }
                AnalyticsAction::Get { report_id } => {
                    let report = service
                        .fetch_report(&ReportId::from(report_id.as_str()))
                        .await?;
                    print!("{}", render_analytics_report(&report));
                }
            }
        }
    }

    Ok(())
}
