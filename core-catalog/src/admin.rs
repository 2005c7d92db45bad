//! Admin console
//!
//! Dashboard data and inventory uploads. Every call requires a staff or
//! superuser session; gate the screen with `core_auth::AdminGate` first.

use crate::catalog::Listing;
use crate::error::{CatalogError, Result};
use crate::listing::{ImageUpload, NewCarListing};
use crate::types::{AdminStats, AdminUser, Dashboard};
use bridge_traits::http::{HttpMethod, HttpRequest};
use bridge_traits::navigation::{Notice, Notifier};
use core_auth::{ApiClient, AuthPolicy};
use core_runtime::config::ClientConfig;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const STATS_PATH: &str = "/admin/stats/";
const USERS_PATH: &str = "/admin/users/";
const ADD_CAR_PATH: &str = "/admin/add-car/";

#[derive(Clone)]
pub struct AdminConsole {
    api: ApiClient,
    notifier: Arc<dyn Notifier>,
}

impl AdminConsole {
    pub fn new(config: &ClientConfig, api: ApiClient) -> Self {
        Self {
            api,
            notifier: Arc::clone(&config.notifier),
        }
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<AdminStats> {
        Ok(self.api.get_json(STATS_PATH, AuthPolicy::Refreshing).await?)
    }

    #[instrument(skip(self))]
    pub async fn users(&self) -> Result<Vec<AdminUser>> {
        let listing: Listing<AdminUser> =
            self.api.get_json(USERS_PATH, AuthPolicy::Refreshing).await?;
        Ok(listing.into_vec())
    }

    /// Stats and users, requested concurrently.
    #[instrument(skip(self))]
    pub async fn load_dashboard(&self) -> Result<Dashboard> {
        let (stats, users) = tokio::try_join!(self.stats(), self.users())?;
        info!(
            cars = stats.car_overview.total,
            users = users.len(),
            "Admin dashboard loaded"
        );
        Ok(Dashboard { stats, users })
    }

    /// Upload a new car and return the refreshed stats.
    ///
    /// The listing is validated locally first; an invalid listing is never
    /// sent.
    #[instrument(skip_all, fields(title = %listing.title, gallery = gallery.len()))]
    pub async fn add_car(
        &self,
        listing: &NewCarListing,
        main_image: &ImageUpload,
        gallery: &[ImageUpload],
    ) -> Result<AdminStats> {
        listing.validate_now().map_err(|errors| {
            warn!(%errors, "Listing rejected before upload");
            CatalogError::InvalidListing(errors)
        })?;

        let request = HttpRequest::new(HttpMethod::Post, self.api.endpoint(ADD_CAR_PATH))
            .multipart(listing.to_form(main_image, gallery));
        self.api.send(request, AuthPolicy::Refreshing).await?;

        info!("Car listing uploaded");
        self.notifier
            .notify(Notice::info("Success", "Car added successfully!"));

        self.stats().await
    }
}
