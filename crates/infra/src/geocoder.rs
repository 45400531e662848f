//! Address geocoding for bootcamp locations and radius searches.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use devcamper_core::GeoPoint;
use devcamper_core::model::{Bootcamp, Location};

const MAPQUEST_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    pub point: GeoPoint,
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl From<GeocodedAddress> for Location {
    fn from(value: GeocodedAddress) -> Self {
        let mut location = Location::at(value.point);
        location.formatted_address = value.formatted_address;
        location.street = value.street;
        location.city = value.city;
        location.state = value.state;
        location.zipcode = value.zipcode;
        location.country = value.country;
        location
    }
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("geocoder returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best match for `address`, or `None` when nothing matched.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;
}

/// MapQuest geocoding API client.
#[derive(Debug, Clone)]
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_key: String,
}

impl MapQuestGeocoder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: MapQuestLatLng,
    #[serde(default)]
    street: String,
    /// City.
    #[serde(default)]
    admin_area5: String,
    /// State.
    #[serde(default)]
    admin_area3: String,
    /// Country.
    #[serde(default)]
    admin_area1: String,
    #[serde(default)]
    postal_code: String,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(s: String) -> Option<String> {
    (!s.trim().is_empty()).then_some(s)
}

impl From<MapQuestLocation> for GeocodedAddress {
    fn from(loc: MapQuestLocation) -> Self {
        let state_zip = format!("{} {}", loc.admin_area3, loc.postal_code);
        let formatted = [
            loc.street.as_str(),
            loc.admin_area5.as_str(),
            state_zip.as_str(),
            loc.admin_area1.as_str(),
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
        Self {
            point: GeoPoint::new(loc.lat_lng.lng, loc.lat_lng.lat),
            formatted_address: non_empty(formatted),
            street: non_empty(loc.street),
            city: non_empty(loc.admin_area5),
            state: non_empty(loc.admin_area3),
            zipcode: non_empty(loc.postal_code),
            country: non_empty(loc.admin_area1),
        }
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let response = self
            .client
            .get(MAPQUEST_URL)
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }
        let body: MapQuestResponse = response.json().await?;
        Ok(body
            .results
            .into_iter()
            .flat_map(|r| r.locations)
            .next()
            .map(GeocodedAddress::from))
    }
}

/// Fixed lookup table; used when no API key is configured and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeocodedAddress>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: impl Into<String>, address: GeocodedAddress) -> Self {
        self.entries.insert(query.into(), address);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        Ok(self.entries.get(address).cloned())
    }
}

/// Fill `bootcamp.location` from its address. The location is left empty
/// when the geocoder finds nothing.
pub async fn locate_bootcamp<G>(geocoder: &G, bootcamp: &mut Bootcamp) -> Result<(), GeocodeError>
where
    G: Geocoder + ?Sized,
{
    let Some(address) = bootcamp.address.as_deref() else {
        return Ok(());
    };
    match geocoder.geocode(address).await? {
        Some(found) => bootcamp.location = Some(found.into()),
        None => tracing::warn!(address, "address could not be geocoded"),
    }
    Ok(())
}
