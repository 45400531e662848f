use serde::{Deserialize, Serialize};

use super::Resource;
use super::validate::{Violations, is_email, is_http_url, slugify};
use crate::collection::Collection;
use crate::error::DomainError;
use crate::geo::GeoPoint;
use crate::id::UserId;

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

fn default_photo() -> String {
    DEFAULT_PHOTO.to_string()
}

/// GeoJSON point plus the structured address it was geocoded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[lng, lat]`
    pub coordinates: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Location {
    pub fn at(point: GeoPoint) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [point.lng, point.lat],
            formatted_address: None,
            street: None,
            city: None,
            state: None,
            zipcode: None,
            country: None,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.coordinates[0], self.coordinates[1])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub careers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_cost: Option<f64>,
    #[serde(default = "default_photo")]
    pub photo: String,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
}

impl Bootcamp {
    /// Recompute `slug` from `name`.
    pub fn refresh_slug(&mut self) {
        self.slug = self.name.as_deref().map(slugify);
    }
}

impl Resource for Bootcamp {
    const COLLECTION: Collection = Collection::Bootcamps;
    const MANAGED_FIELDS: &'static [&'static str] = &["user", "slug", "location", "photo"];

    fn validate(&self) -> Result<(), DomainError> {
        let mut v = Violations::new();
        v.required(self.name.as_deref(), "Please add a name")
            .max_len(self.name.as_deref(), 50, "Name can not be more than 50 characters")
            .required(self.description.as_deref(), "Please add a description")
            .max_len(
                self.description.as_deref(),
                500,
                "Description can not be more than 500 characters",
            )
            .check(
                self.website.as_deref().is_none_or(is_http_url),
                "Please use a valid URL with HTTP or HTTPS",
            )
            .max_len(
                self.phone.as_deref(),
                20,
                "Phone number can not be longer than 20 characters",
            )
            .check(
                self.email.as_deref().is_none_or(is_email),
                "Please add a valid email",
            )
            .required(self.address.as_deref(), "Please add an address")
            .check(!self.careers.is_empty(), "Please add at least one career")
            .check(
                self.average_rating.is_none_or(|r| (1.0..=10.0).contains(&r)),
                "Average rating must be between 1 and 10",
            )
            .check(
                self.average_cost.is_none_or(|c| c >= 0.0),
                "Average cost can not be negative",
            )
            .check(self.user.is_some(), "Bootcamp must belong to a user");
        for career in &self.careers {
            v.check(
                CAREERS.contains(&career.as_str()),
                format!("`{career}` is not a valid career"),
            );
        }
        v.finish()
    }
}
