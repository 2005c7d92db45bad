//! Public car catalog
//!
//! Read-only views of the dealership inventory.

use crate::error::{CatalogError, Result};
use crate::types::Car;
use core_auth::{ApiClient, AuthError, AuthPolicy};
use serde::Deserialize;
use tracing::{debug, instrument};

/// List endpoints answer with a bare array or a paginated page.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Plain(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Plain(items) | Listing::Page { results: items } => items,
        }
    }
}

/// Car catalog API
///
/// # Example
///
/// ```ignore
/// use core_catalog::CarCatalog;
///
/// let catalog = CarCatalog::new(api.clone());
/// for car in catalog.featured().await? {
///     println!("{} - {}", car.title, car.price);
/// }
/// ```
#[derive(Clone)]
pub struct CarCatalog {
    api: ApiClient,
}

impl CarCatalog {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Cars promoted on the home page
    #[instrument(skip(self))]
    pub async fn featured(&self) -> Result<Vec<Car>> {
        self.list("/cars/featured/").await
    }

    /// Latest additions
    #[instrument(skip(self))]
    pub async fn recent(&self) -> Result<Vec<Car>> {
        self.list("/cars/recent/").await
    }

    /// One car by slug
    #[instrument(skip(self))]
    pub async fn detail(&self, slug: &str) -> Result<Car> {
        self.api
            .get_json(&car_path(slug, ""), AuthPolicy::Anonymous)
            .await
            .map_err(|e| not_found(e, slug))
    }

    /// Cars of the same make as `slug`
    #[instrument(skip(self))]
    pub async fn related(&self, slug: &str) -> Result<Vec<Car>> {
        let listing: Listing<Car> = self
            .api
            .get_json(&car_path(slug, "related/"), AuthPolicy::Anonymous)
            .await
            .map_err(|e| not_found(e, slug))?;
        Ok(listing.into_vec())
    }

    async fn list(&self, path: &str) -> Result<Vec<Car>> {
        let listing: Listing<Car> = self.api.get_json(path, AuthPolicy::Refreshing).await?;
        let cars = listing.into_vec();
        debug!(path, count = cars.len(), "Catalog listing loaded");
        Ok(cars)
    }
}

/// `/cars/{slug}/{suffix}` with the slug percent-encoded as one path segment.
fn car_path(slug: &str, suffix: &str) -> String {
    format!("/cars/{}/{}", urlencoding::encode(slug), suffix)
}

fn not_found(err: AuthError, slug: &str) -> CatalogError {
    match err.status() {
        Some(404) => CatalogError::NotFound {
            slug: slug.to_string(),
        },
        _ => CatalogError::Api(err),
    }
}
