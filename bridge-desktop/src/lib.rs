//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `KeyValueStore` for the persistent scope using a SQLite table
//! - `KeyValueStore` for the cookie and session scopes kept in memory
//! - `Navigator` as an in-process history stack
//! - `Notifier` forwarding notices to `tracing`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{MemoryStore, ReqwestHttpClient, SqliteKeyValueStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new().expect("http client");
//!     let cookies = MemoryStore::cookie_jar();
//!     let persistent = SqliteKeyValueStore::open_lazy(SqliteKeyValueStore::default_path())
//!         .expect("persistent store");
//!
//!     // Use in client configuration
//! }
//! ```

mod http;
mod memory;
mod navigation;
mod settings;

pub use http::ReqwestHttpClient;
pub use memory::MemoryStore;
pub use navigation::{HistoryNavigator, TracingNotifier};
pub use settings::SqliteKeyValueStore;
