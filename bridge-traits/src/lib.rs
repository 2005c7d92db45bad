//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host shell implements for the
//! storefront client core.
//!
//! ## Overview
//!
//! The core owns session logic but none of the platform plumbing. Every
//! capability it needs from the outside world is a trait here:
//!
//! - [`HttpClient`](http::HttpClient) - Transport for the REST backend
//! - [`KeyValueStore`](storage::KeyValueStore) - Cookie jar, persistent and session-scoped storage
//! - [`Navigator`](navigation::Navigator) - Route changes (home, login)
//! - [`Notifier`](navigation::Notifier) - Transient notices (toasts)
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | Web      | host-provided       |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and keep messages free of credentials.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across async
//! tasks behind `Arc`.

pub mod error;
pub mod http;
pub mod log;
pub mod navigation;
pub mod storage;

pub use error::BridgeError;

pub use http::{
    FormPart, HttpBody, HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm,
    RetryPolicy,
};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use navigation::{Navigator, Notice, NoticeVariant, Notifier};
pub use storage::{KeyValueStore, StorageScope};
