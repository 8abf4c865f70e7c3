//! Plain-text rendering for finished reports.
//!
//! Rendering is pure: these functions take finished values and return
//! strings, no I/O and no mutation. Sections with nothing to say are
//! omitted rather than printed empty.

use std::collections::HashMap;
use std::fmt::Write;

use super::metrics::TeamReport;
use crate::providers::inbox::{AnalyticsReport, TimingTotals};

/// Renders a [`TeamReport`] as a plain-text summary.
pub fn render_team_report(report: &TeamReport) -> String {
    let mut out = String::new();
    let metrics = &report.metrics;

    let _ = writeln!(out, "Team metrics: {}", report.team);
    let _ = writeln!(
        out,
        "Window: {} to {}",
        report.range.start().format("%Y-%m-%d"),
        report.range.end().format("%Y-%m-%d"),
    );
    out.push('\n');

    let _ = writeln!(out, "Conversations analyzed: {}", metrics.total_conversations);
    if metrics.conversations_skipped > 0 {
        let _ = writeln!(
            out,
            "Conversations skipped (fetch failed): {}",
            metrics.conversations_skipped
        );
    }
    let _ = writeln!(out, "Inbound messages: {}", metrics.total_inbound);
    let _ = writeln!(out, "Outbound messages: {}", metrics.total_outbound);
    let _ = writeln!(
        out,
        "Conversations with a reply: {}",
        metrics.conversations_with_reply
    );

    if let Some(section) = channel_section("Inbound by channel", &metrics.inbound_by_channel) {
        out.push('\n');
        out.push_str(&section);
    }
    if let Some(section) = channel_section("Outbound by channel", &metrics.outbound_by_channel) {
        out.push('\n');
        out.push_str(&section);
    }

    if let Some(latency) = &report.latency {
        out.push('\n');
        let _ = writeln!(
            out,
            "Average first reply: {}",
            format_duration(latency.mean_secs.round() as u64)
        );
        let _ = writeln!(out, "Reply time distribution:");
        for bucket in &latency.buckets {
            let _ = writeln!(
                out,
                "  {:<10} {:>4}  ({}%)",
                bucket.label, bucket.count, bucket.percent
            );
        }
    }

    out
}

/// Renders a native upstream analytics report as plain text.
///
/// A report still being computed upstream renders as a short notice so
/// the caller knows to poll again.
pub fn render_analytics_report(report: &AnalyticsReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Analytics report {}", report.id);
    if let (Some(start), Some(end)) = (&report.start_date, &report.end_date) {
        let _ = writeln!(out, "Window: {} to {}", start, end);
    }

    if report.is_processing() {
        let _ = writeln!(out, "\nStill processing ({}); fetch again shortly.", report.status);
        return out;
    }

    let mut rendered_any = false;

    if let Some(conversations) = &report.conversations {
        out.push('\n');
        let _ = writeln!(out, "Conversations:");
        let _ = writeln!(out, "  total:    {}", conversations.total);
        let _ = writeln!(out, "  new:      {}", conversations.new);
        let _ = writeln!(out, "  closed:   {}", conversations.closed);
        let _ = writeln!(out, "  reopened: {}", conversations.reopened);
        rendered_any = true;
    }

    if let Some(messages) = &report.messages {
        out.push('\n');
        let _ = writeln!(out, "Messages:");
        let _ = writeln!(out, "  total:    {}", messages.total);
        let _ = writeln!(out, "  inbound:  {}", messages.inbound);
        let _ = writeln!(out, "  outbound: {}", messages.outbound);
        rendered_any = true;
    }

    if let Some(section) = timing_section("Response time", report.response_time.as_ref()) {
        out.push('\n');
        out.push_str(&section);
        rendered_any = true;
    }
    if let Some(section) = timing_section("Resolution time", report.resolution_time.as_ref()) {
        out.push('\n');
        out.push_str(&section);
        rendered_any = true;
    }

    if !report.teams.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "Teams:");
        for team in &report.teams {
            let name = team.name.as_deref().or(team.id.as_deref()).unwrap_or("(unnamed)");
            let _ = writeln!(
                out,
                "  {}: {} conversations, {} messages",
                name, team.conversations, team.messages
            );
        }
        rendered_any = true;
    }

    if !report.users.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "Users:");
        for user in &report.users {
            let name = user.name.as_deref().or(user.email.as_deref()).unwrap_or("(unknown)");
            let _ = writeln!(
                out,
                "  {}: {} conversations, {} sent",
                name, user.conversations, user.messages_sent
            );
        }
        rendered_any = true;
    }

    if !report.labels.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "Labels:");
        for label in &report.labels {
            let _ = writeln!(
                out,
                "  {}: {}",
                label.name.as_deref().unwrap_or("(unnamed)"),
                label.count
            );
        }
        rendered_any = true;
    }

    // Nothing modeled matched; show what the server sent instead of an
    // empty report.
    if !rendered_any && !report.extra.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "Raw report data:");
        match serde_json::to_string_pretty(&report.extra) {
            Ok(json) => {
                for line in json.lines() {
                    let _ = writeln!(out, "  {}", line);
                }
            }
            Err(_) => {
                let _ = writeln!(out, "  (unrenderable)");
            }
        }
    }

    out
}

fn timing_section(title: &str, timing: Option<&TimingTotals>) -> Option<String> {
    let timing = timing?;
    if timing.average_seconds == 0 && timing.median_seconds == 0 {
        return None;
    }
    let mut out = String::new();
    let _ = writeln!(out, "{}:", title);
    let _ = writeln!(out, "  average: {}", format_duration(timing.average_seconds));
    let _ = writeln!(out, "  median:  {}", format_duration(timing.median_seconds));
    Some(out)
}

fn channel_section(title: &str, counts: &HashMap<String, u64>) -> Option<String> {
    if counts.is_empty() {
        return None;
    }
    // Busiest channels first, name as tie-break for stable output.
    let mut entries: Vec<(&String, &u64)> = counts.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut out = String::new();
    let _ = writeln!(out, "{}:", title);
    for (channel, count) in entries {
        let _ = writeln!(out, "  {}: {}", channel, count);
    }
    Some(out)
}

/// Formats a duration in seconds as `2h 5m`, `45m`, or `30s`.
fn format_duration(secs: u64) -> String {
    if secs >= 3_600 {
        format!("{}h {}m", secs / 3_600, (secs % 3_600) / 60)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use crate::domain::{DateRange, ReportId, TeamId};
    use crate::services::metrics::{LatencySummary, RunMetrics};

    fn base_report(metrics: RunMetrics) -> TeamReport {
        let latency = LatencySummary::from_latencies(&metrics.reply_latencies);
        TeamReport {
            team: TeamId::from("team-1"),
            range: DateRange::from_dates("2024-06-01", "2024-06-30").unwrap(),
            metrics,
            latency,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn renders_totals_and_window() {
        let rendered = render_team_report(&base_report(RunMetrics {
            total_conversations: 3,
            total_inbound: 5,
            total_outbound: 4,
            ..Default::default()
        }));

        assert!(rendered.contains("Team metrics: team-1"));
        assert!(rendered.contains("Window: 2024-06-01 to 2024-06-30"));
        assert!(rendered.contains("Conversations analyzed: 3"));
        assert!(rendered.contains("Inbound messages: 5"));
        assert!(rendered.contains("Outbound messages: 4"));
    }

    #[test]
    fn omits_empty_sections() {
        let rendered = render_team_report(&base_report(RunMetrics::default()));

        assert!(!rendered.contains("by channel"));
        assert!(!rendered.contains("distribution"));
        assert!(!rendered.contains("skipped"));
    }

    #[test]
    fn skipped_count_appears_only_when_nonzero() {
        let rendered = render_team_report(&base_report(RunMetrics {
            conversations_skipped: 2,
            ..Default::default()
        }));
        assert!(rendered.contains("Conversations skipped (fetch failed): 2"));
    }

    #[test]
    fn channels_are_sorted_by_count_descending() {
        let mut metrics = RunMetrics::default();
        metrics.inbound_by_channel.insert("a@x.com".into(), 1);
        metrics.inbound_by_channel.insert("b@x.com".into(), 5);

        let rendered = render_team_report(&base_report(metrics));
        let b_pos = rendered.find("b@x.com").unwrap();
        let a_pos = rendered.find("a@x.com").unwrap();
        assert!(b_pos < a_pos);
    }

    #[test]
    fn latency_section_lists_all_buckets() {
        let rendered = render_team_report(&base_report(RunMetrics {
            total_conversations: 1,
            conversations_with_reply: 1,
            reply_latencies: vec![120.0],
            ..Default::default()
        }));

        assert!(rendered.contains("Average first reply: 2m"));
        assert!(rendered.contains("under 15m"));
        assert!(rendered.contains("over 48h"));
        assert!(rendered.contains("(100%)"));
    }

    #[test]
    fn rendering_does_not_mutate_input() {
        let report = base_report(RunMetrics {
            total_conversations: 1,
            ..Default::default()
        });
        let first = render_team_report(&report);
        let second = render_team_report(&report);
        assert_eq!(first, second);
    }

    #[test]
    fn processing_report_renders_notice_only() {
        let report: AnalyticsReport =
            serde_json::from_str(r#"{"id":"r-1","status":"processing"}"#).unwrap();

        let rendered = render_analytics_report(&report);
        assert!(rendered.contains("Still processing (processing)"));
        assert!(!rendered.contains("Conversations:"));
    }

    #[test]
    fn finished_report_renders_modeled_sections() {
        let report: AnalyticsReport = serde_json::from_str(
            r#"{
                "id": "r-2",
                "status": "done",
                "start_date": "2024-06-01",
                "end_date": "2024-06-30",
                "conversations": {"total": 40, "new": 10, "closed": 8, "reopened": 1},
                "messages": {"total": 120, "inbound": 70, "outbound": 50},
                "response_time": {"average_seconds": 7500, "median_seconds": 3000},
                "users": [{"name": "Ana", "conversations": 12, "messages_sent": 30}]
            }"#,
        )
        .unwrap();

        let rendered = render_analytics_report(&report);
        assert!(rendered.contains("Analytics report r-2"));
        assert!(rendered.contains("Window: 2024-06-01 to 2024-06-30"));
        assert!(rendered.contains("total:    40"));
        assert!(rendered.contains("inbound:  70"));
        assert!(rendered.contains("average: 2h 5m"));
        assert!(rendered.contains("median:  50m"));
        assert!(rendered.contains("Ana: 12 conversations, 30 sent"));
    }

    #[test]
    fn unmodeled_report_falls_back_to_raw_data() {
        let report: AnalyticsReport =
            serde_json::from_str(r#"{"id":"r-3","status":"done","custom_section":{"k":1}}"#)
                .unwrap();

        let rendered = render_analytics_report(&report);
        assert!(rendered.contains("Raw report data:"));
        assert!(rendered.contains("custom_section"));
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(120), "2m");
        assert_eq!(format_duration(3_660), "1h 1m");
        assert_eq!(format_duration(7_500), "2h 5m");
    }

    // ReportId keeps its inner string visible through Display.
    #[test]
    fn report_id_display_matches_wire_value() {
        assert_eq!(ReportId::from("r-9").to_string(), "r-9");
    }
}
