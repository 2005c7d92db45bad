//! Error types for the catalog and admin console

use core_auth::{AuthError, ErrorCategory, ValidationErrors};
use thiserror::Error;

/// Catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The listing did not pass local validation; nothing was sent.
    #[error("Invalid listing: {0}")]
    InvalidListing(ValidationErrors),

    /// No car with this slug.
    #[error("Car not found: {slug}")]
    NotFound { slug: String },

    /// Request failed below the catalog (transport, session, backend status)
    #[error(transparent)]
    Api(#[from] AuthError),
}

impl CatalogError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CatalogError::InvalidListing(_) => ErrorCategory::Validation,
            CatalogError::NotFound { .. } => ErrorCategory::Client,
            CatalogError::Api(err) => err.category(),
        }
    }
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
