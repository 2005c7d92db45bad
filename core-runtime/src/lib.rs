//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the storefront client core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//! - View lifetime guards
//!
//! ## Overview
//!
//! This crate contains the runtime utilities every other core crate depends
//! on. It establishes the logging conventions, the host bridge wiring and the
//! event broadcasting used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod scope;

pub use config::{ClientConfig, ClientConfigBuilder, Routes};
pub use error::{Error, Result};
pub use events::{AuthEvent, CoreEvent, EventBus, IdentityEvent};
pub use scope::{ScopeGuard, ViewScope};
