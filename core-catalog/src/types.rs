//! Catalog and admin API payloads
//!
//! Every payload tolerates fields this client does not model; they are kept
//! in `extra`.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A car listing as served by `/cars/...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: i64,
    pub slug: String,
    pub title: String,

    /// Asking price. The backend serializes decimals as strings; plain
    /// numbers are accepted too.
    #[serde(deserialize_with = "number_or_string")]
    pub price: f64,

    #[serde(default)]
    pub make: String,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default)]
    pub mileage: Option<u64>,

    #[serde(default)]
    pub fuel_type: Option<String>,

    #[serde(default)]
    pub transmission: Option<String>,

    #[serde(default)]
    pub condition: Option<String>,

    /// URL of the cover image
    #[serde(default)]
    pub main_image: Option<String>,

    /// Gallery, in display order
    #[serde(default)]
    pub images: Vec<CarImage>,

    #[serde(default)]
    pub is_featured: bool,

    #[serde(default = "default_true")]
    pub is_available: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Gallery entry: a bare URL or an image record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CarImage {
    Url(String),
    Record {
        #[serde(default)]
        id: Option<i64>,
        image: String,
    },
}

impl CarImage {
    pub fn url(&self) -> &str {
        match self {
            CarImage::Url(url) => url,
            CarImage::Record { image, .. } => image,
        }
    }
}

/// `GET /admin/stats/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminStats {
    #[serde(default)]
    pub car_overview: CarOverview,

    #[serde(default)]
    pub user_stats: UserStats,

    /// Listing counts per make
    #[serde(default)]
    pub car_stats: Vec<MakeCount>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarOverview {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub available: u64,
    #[serde(default)]
    pub featured: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub admins: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeCount {
    pub make: String,
    pub count: u64,
}

impl AdminStats {
    /// Fraction (0.0..=1.0) of all listings held by `entry`.
    pub fn share(&self, entry: &MakeCount) -> f64 {
        match self.car_overview.total {
            0 => 0.0,
            total => entry.count as f64 / total as f64,
        }
    }
}

/// Row of `GET /admin/users/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub is_staff: bool,

    /// RFC 3339
    #[serde(default)]
    pub date_joined: Option<String>,

    /// RFC 3339; `None` if the user never logged in
    #[serde(default)]
    pub last_login: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AdminUser {
    pub fn joined_at(&self) -> Option<DateTime<Utc>> {
        self.date_joined.as_deref().and_then(parse_timestamp)
    }

    pub fn last_login_at(&self) -> Option<DateTime<Utc>> {
        self.last_login.as_deref().and_then(parse_timestamp)
    }
}

/// Both dashboard payloads, loaded together.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub stats: AdminStats,
    pub users: Vec<AdminUser>,
}

fn parse_timestamp(rfc3339: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(rfc3339)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn default_true() -> bool {
    true
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid price '{}'", text))),
    }
}
