//! New car listing form
//!
//! Mirrors the admin "Add New Car" dialog: the option lists it offers, its
//! defaults, and the multipart layout `POST /admin/add-car/` expects.

use bridge_traits::http::MultipartForm;
use bytes::Bytes;
use chrono::{Datelike, Utc};
use core_auth::ValidationErrors;
use std::fmt;

/// Oldest model year the form offers.
pub const OLDEST_MODEL_YEAR: i32 = 2016;

/// `(value, label)` pairs of the makes the dealership lists.
pub const CAR_BRANDS: &[(&str, &str)] = &[
    ("audi", "AUDI"),
    ("bently", "BENTLY"),
    ("bmw", "BMW"),
    ("ford", "FORD"),
    ("gmc", "GMC"),
    ("honda", "HONDA"),
    ("hyundai", "HYUNDAI"),
    ("jaguar", "JAGUAR"),
    ("jeep", "JEEP"),
    ("kia", "KIA"),
    ("land rover", "LAND ROVER"),
    ("lexus", "LEXUS"),
    ("mazda", "MAZDA"),
    ("mercedes", "MERCEDES"),
    ("mitsubishi", "MITSUBISHI"),
    ("nissan", "NISSAN"),
    ("porsche", "PORSCHE"),
    ("toyota", "TOYOTA"),
];

/// Model years offered for `current_year`, newest first.
pub fn model_years(current_year: i32) -> Vec<i32> {
    (OLDEST_MODEL_YEAR..=current_year).rev().collect()
}

macro_rules! form_choice {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($value:literal, $label:literal)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire value
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

form_choice!(FuelType {
    Petrol => ("petrol", "Petrol"),
    Diesel => ("diesel", "Diesel"),
    Hybrid => ("hybrid", "Hybrid"),
    Electric => ("electric", "Electric"),
});

form_choice!(Transmission {
    Manual => ("manual", "Manual"),
    Automatic => ("automatic", "Automatic"),
});

form_choice!(Condition {
    New => ("new", "New"),
    Used => ("used", "Used"),
    Certified => ("certified", "Certified Pre-owned"),
});

/// An image picked for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            data: data.into(),
        }
    }
}

/// Admin form for a new car.
///
/// Free-text fields hold what the admin typed; `price` and `mileage` are
/// checked by [`NewCarListing::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewCarListing {
    pub title: String,
    pub description: String,
    pub price: String,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub mileage: String,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    pub condition: Condition,
    pub color: String,
    pub engine_size: String,
    pub doors: u8,
    pub seats: u8,
    pub features: String,
    pub is_featured: bool,
    pub is_available: bool,
}

impl Default for NewCarListing {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            price: String::new(),
            make: String::new(),
            model: String::new(),
            year: None,
            mileage: String::new(),
            fuel_type: FuelType::Petrol,
            transmission: Transmission::Manual,
            condition: Condition::Used,
            color: String::new(),
            engine_size: String::new(),
            doors: 4,
            seats: 5,
            features: String::new(),
            is_featured: false,
            is_available: true,
        }
    }
}

impl NewCarListing {
    /// Check the form the way the dialog does before anything is uploaded.
    pub fn validate(&self, current_year: i32) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut reject = |field: &str, message: &str| {
            errors
                .fields
                .entry(field.to_string())
                .or_default()
                .push(message.to_string());
        };

        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("model", &self.model),
        ] {
            if value.trim().is_empty() {
                reject(field, "This field is required.");
            }
        }

        match self.price.trim().parse::<f64>() {
            Ok(price) if price.is_finite() && price > 0.0 => {}
            _ if self.price.trim().is_empty() => reject("price", "This field is required."),
            _ => reject("price", "Enter a valid price."),
        }

        if self.mileage.trim().is_empty() {
            reject("mileage", "This field is required.");
        } else if self.mileage.trim().parse::<u64>().is_err() {
            reject("mileage", "Enter a whole number.");
        }

        if !CAR_BRANDS.iter().any(|(value, _)| *value == self.make) {
            reject("make", "Select a make from the list.");
        }

        match self.year {
            Some(year) if model_years(current_year).contains(&year) => {}
            _ => reject("year", "Select a model year from the list."),
        }

        if self.doors == 0 {
            reject("doors", "Enter the number of doors.");
        }
        if self.seats == 0 {
            reject("seats", "Enter the number of seats.");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate against this year's model list.
    pub fn validate_now(&self) -> Result<(), ValidationErrors> {
        self.validate(Utc::now().year())
    }

    /// Multipart body for `POST /admin/add-car/`.
    ///
    /// Text fields come first in form order, then `main_image`, then one
    /// `gallery_images` part per gallery file.
    pub fn to_form(&self, main_image: &ImageUpload, gallery: &[ImageUpload]) -> MultipartForm {
        let year = self.year.map(|year| year.to_string()).unwrap_or_default();

        let mut form = MultipartForm::new()
            .text("title", self.title.trim())
            .text("description", self.description.trim())
            .text("price", self.price.trim())
            .text("make", self.make.as_str())
            .text("model", self.model.trim())
            .text("year", year)
            .text("mileage", self.mileage.trim())
            .text("fuel_type", self.fuel_type.as_str())
            .text("transmission", self.transmission.as_str())
            .text("condition", self.condition.as_str())
            .text("color", self.color.trim())
            .text("engine_size", self.engine_size.trim())
            .text("doors", self.doors.to_string())
            .text("seats", self.seats.to_string())
            .text("features", self.features.trim())
            .text("is_featured", self.is_featured.to_string())
            .text("is_available", self.is_available.to_string());

        form = form.file(
            "main_image",
            main_image.file_name.as_str(),
            main_image.content_type.clone(),
            main_image.data.clone(),
        );
        for image in gallery {
            form = form.file(
                "gallery_images",
                image.file_name.as_str(),
                image.content_type.clone(),
                image.data.clone(),
            );
        }
        form
    }
}
