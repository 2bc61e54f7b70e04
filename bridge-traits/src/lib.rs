//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host shell.
//!
//! ## Overview
//!
//! This crate defines the contract between the session core and the host it
//! runs in. Each trait represents a capability the core requires but that is
//! implemented differently per host (desktop shell, browser, test harness).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations (token refresh, Web API calls)
//! - [`SessionStorage`](storage::SessionStorage) - Durable, origin-scoped key/value records
//! - [`Navigator`](navigation::Navigator) - Current location, URL rewriting, redirects
//! - [`Clock`](time::Clock) - Time source for deterministic expiry arithmetic
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should convert platform errors to `BridgeError` and keep
//! secrets (tokens, refresh values) out of error messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single bridge handle can be
//! shared between the session manager and every API caller.
//!
//! ## Examples
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod navigation;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use navigation::Navigator;
pub use storage::SessionStorage;
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
