//! External service provider implementations.
//!
//! - [`inbox`] - the shared-inbox HTTP API (conversations, messages,
//!   native analytics reports)

pub mod inbox;
