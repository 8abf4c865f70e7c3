//! Conversation and message domain types.
//!
//! These are the transient upstream entities walked during a metrics run.
//! They are fetched per run, never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ConversationId;

/// A conversation as listed by the upstream API.
///
/// Only the fields the metrics engine consumes are carried; the upstream
/// record has many more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier for this conversation.
    pub id: ConversationId,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
    /// Most recent activity on the conversation.
    pub last_activity_at: DateTime<Utc>,
}

/// A single message within a conversation.
///
/// Upstream records can be missing any of these fields; absence is
/// tolerated everywhere downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Sender, if the upstream record carried one.
    pub from_field: Option<Address>,
    /// Recipients.
    pub to_fields: Vec<Address>,
    /// Delivery time, if known.
    pub delivered_at: Option<DateTime<Utc>>,
}

/// An email address with optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Email address.
    pub address: String,
    /// Display name (e.g., "John Doe").
    pub name: Option<String>,
}

impl Address {
    /// Creates a new address with just an email.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    /// Creates a new address with email and display name.
    pub fn with_name(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: Some(name.into()),
        }
    }

    /// Returns the display representation of this address.
    ///
    /// If a name is present, returns "Name <email>", otherwise just the email.
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.address),
            None => self.address.clone(),
        }
    }
}

impl Message {
    /// Returns the sender address string, or an empty string when the
    /// record has no usable sender.
    pub fn sender_address(&self) -> &str {
        self.from_field
            .as_ref()
            .map(|a| a.address.as_str())
            .unwrap_or("")
    }
}
