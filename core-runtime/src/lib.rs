//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the session core:
//! - Logging and tracing setup
//! - Session configuration
//! - Event bus for session lifecycle events
//!
//! Every other workspace crate depends on this one for its logging
//! conventions, configuration types and event broadcasting.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, SessionEvent, SessionSource};
