//! # Dealership Catalog
//!
//! Inventory views and the admin console, built on the authenticated
//! `ApiClient` from `core-auth`.
//!
//! ## Overview
//!
//! This module provides:
//! - Featured, recent, detail and related car listings
//! - Admin dashboard data (stats and users, loaded concurrently)
//! - New listing form options, validation and multipart upload

pub mod admin;
pub mod catalog;
pub mod error;
pub mod listing;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin::AdminConsole;
pub use catalog::CarCatalog;
pub use error::{CatalogError, Result};
pub use listing::{
    model_years, Condition, FuelType, ImageUpload, NewCarListing, Transmission, CAR_BRANDS,
    OLDEST_MODEL_YEAR,
};
pub use types::{AdminStats, AdminUser, Car, CarImage, CarOverview, Dashboard, MakeCount, UserStats};
