//! # Authentication Module
//!
//! Session management for the dealership storefront.
//!
//! ## Overview
//!
//! This module owns the backend session (access/refresh token pair plus the
//! cached profile), the request interceptor that keeps it alive, the admin
//! gate, and the separate identity-provider session used by the storefront
//! sign-in pages.
//!
//! ## Features
//!
//! - Write-through token storage over cookie, persistent and session stores
//! - Login, registration and logout through one canonical post-auth sequence
//! - Bearer attachment with a single-flight refresh-and-retry on 401
//! - Admin gating against a live profile, with stale-response protection
//! - Session snapshots published to subscribers on every change
//! - Email/password and OAuth sign-in through a hosted identity provider

pub mod admin_gate;
pub mod client;
pub mod error;
pub mod identity;
pub mod manager;
mod refresh;
pub mod token_store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin_gate::{AccessDenial, AdminAccess, AdminGate};
pub use client::{ApiClient, AuthPolicy};
pub use error::{AuthError, ErrorCategory, RefreshFailure, Result, ValidationErrors};
pub use identity::{
    IdentityError, IdentityProvider, IdentitySession, IdentityState, IdentityUser, ProviderError,
    SignInMode,
};
pub use manager::AuthManager;
pub use token_store::TokenStore;
pub use types::{AuthSession, LoginRequest, Profile, RegisterRequest, SessionSnapshot, TokenPair};
