//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `SessionStorage` as a JSON file per origin under the user data directory
//! - `SessionStorage` backed by the OS keychain (`secure-store` feature)
//! - `Navigator` as an in-memory location the embedding shell drives
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileSessionStorage, MemoryNavigator, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new();
//!     let storage = FileSessionStorage::for_origin("http://localhost:3000");
//!     let navigator = MemoryNavigator::new("http://localhost:3000/");
//!
//!     // Hand the bridges to core-service
//! }
//! ```

mod http;
mod navigation;
mod storage;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use http::ReqwestHttpClient;
pub use navigation::MemoryNavigator;
pub use storage::FileSessionStorage;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSessionStorage;
