//! Reverse geocoding of track endpoints into short place labels such as
//! `"Boulder, CO"` or `"Annecy, Auvergne-Rhône-Alpes, France"`.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::geo::Coordinate;

const UNITED_STATES: &str = "United States";

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("geocoder request timed out")]
    Timeout,
    #[error("geocoder service error: {0}")]
    Service(String),
}

/// The subset of a Nominatim address record used for labels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub hamlet: Option<String>,
    pub suburb: Option<String>,
    pub neighbourhood: Option<String>,
    pub state: Option<String>,
    pub province: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl Address {
    fn locality(&self) -> Option<&str> {
        first_present(&[
            &self.city,
            &self.town,
            &self.village,
            &self.hamlet,
            &self.suburb,
            &self.neighbourhood,
        ])
    }

    fn region(&self) -> Option<&str> {
        first_present(&[&self.state, &self.province, &self.region])
    }

    fn country(&self) -> Option<&str> {
        first_present(&[&self.country])
    }
}

fn first_present<'a>(fields: &[&'a Option<String>]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| field.as_deref())
        .find(|value| !value.is_empty())
}

/// A source of address records for coordinates.
pub trait ReverseGeocoder {
    /// `Ok(None)` means the service answered but has no address for the point.
    fn reverse(&self, coordinate: Coordinate) -> Result<Option<Address>, GeocodeError>;
}

impl<G: ReverseGeocoder + ?Sized> ReverseGeocoder for Box<G> {
    fn reverse(&self, coordinate: Coordinate) -> Result<Option<Address>, GeocodeError> {
        (**self).reverse(coordinate)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Base URL of a Nominatim instance; `/reverse` is appended.
    pub endpoint: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("gpx_summary/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Blocking client for the OpenStreetMap Nominatim `/reverse` API.
pub struct NominatimGeocoder {
    client: Client,
    reverse_url: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GeocodeError::Service(e.to_string()))?;
        Ok(Self {
            client,
            reverse_url: format!("{}/reverse", config.endpoint.trim_end_matches('/')),
        })
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn reverse(&self, coordinate: Coordinate) -> Result<Option<Address>, GeocodeError> {
        debug!(
            "GET {} lat={} lon={}",
            self.reverse_url, coordinate.lat, coordinate.lon
        );
        let response = self
            .client
            .get(&self.reverse_url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("addressdetails", "1".to_string()),
                ("lat", coordinate.lat.to_string()),
                ("lon", coordinate.lon.to_string()),
            ])
            .send()
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Service(format!("HTTP {}", status)));
        }
        let body: ReverseResponse = response.json().map_err(request_error)?;
        Ok(body.address)
    }
}

fn request_error(err: reqwest::Error) -> GeocodeError {
    if err.is_timeout() {
        GeocodeError::Timeout
    } else {
        GeocodeError::Service(err.to_string())
    }
}

/// Never touches the network; every place becomes a coordinate label.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineGeocoder;

impl ReverseGeocoder for OfflineGeocoder {
    fn reverse(&self, _coordinate: Coordinate) -> Result<Option<Address>, GeocodeError> {
        Ok(None)
    }
}

/// Turns coordinates into labels, retrying transient geocoder failures.
pub struct PlaceResolver<G> {
    geocoder: G,
    max_attempts: u32,
    backoff: Duration,
}

impl<G: ReverseGeocoder> PlaceResolver<G> {
    pub fn new(geocoder: G) -> Self {
        Self::from_config(geocoder, &GeocoderConfig::default())
    }

    pub fn from_config(geocoder: G, config: &GeocoderConfig) -> Self {
        Self {
            geocoder,
            max_attempts: config.max_attempts,
            backoff: config.backoff,
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.backoff = backoff;
        self
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    /// Best-effort label for `coordinate`; falls back to `"(lat, lon)"`.
    pub fn resolve(&self, coordinate: Coordinate) -> String {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.geocoder.reverse(coordinate) {
                Ok(Some(address)) => return format_place(&address, coordinate),
                Ok(None) => {
                    debug!(
                        "no address for ({:.4}, {:.4})",
                        coordinate.lat, coordinate.lon
                    );
                    break;
                }
                Err(err) if attempt < attempts => {
                    warn!(
                        "Geocoding attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, attempts, err, self.backoff
                    );
                    thread::sleep(self.backoff);
                }
                Err(err) => {
                    warn!("Geocoding failed after {} attempts: {}", attempts, err);
                }
            }
        }
        coordinate_label(coordinate)
    }
}

pub fn coordinate_label(coordinate: Coordinate) -> String {
    format!("({:.4}, {:.4})", coordinate.lat, coordinate.lon)
}

/// Join locality, region and country with `", "`.
///
/// US addresses drop the country and shorten the state to its postal code.
pub fn format_place(address: &Address, coordinate: Coordinate) -> String {
    let country = address.country();
    let in_us = country == Some(UNITED_STATES);

    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if let Some(locality) = address.locality() {
        parts.push(locality);
    }
    if let Some(state) = address.region() {
        if in_us {
            parts.push(state_abbreviation(state).unwrap_or(state));
        } else {
            parts.push(state);
        }
    }
    if let Some(country) = country.filter(|_| !in_us) {
        parts.push(country);
    }

    if parts.is_empty() {
        coordinate_label(coordinate)
    } else {
        parts.join(", ")
    }
}

const US_STATES: [(&str, &str); 50] = [
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
];

pub fn state_abbreviation(state: &str) -> Option<&'static str> {
    US_STATES
        .iter()
        .find(|(name, _)| *name == state)
        .map(|(_, code)| *code)
}
