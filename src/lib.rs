//! tally - Team reply metrics for Missive-style shared mailboxes
//!
//! This crate provides the core functionality for the tally reporting
//! tool: a rate-limited API client, conversation paging, message
//! classification, and run-wide metrics aggregation and rendering.

pub mod config;
pub mod domain;
pub mod providers;
pub mod services;

pub use config::Settings;
pub use services::{MetricsAggregator, MetricsError, MetricsRequest, TeamReport};
