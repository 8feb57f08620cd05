//! Core data models for Skywatch
//!
//! This module contains the data types used throughout the application
//! for representing weather snapshots, forecast samples, saved cities,
//! and the error taxonomy shared by the fetch pipeline.

pub mod openweather;

pub use openweather::{OpenWeatherClient, WeatherApi};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scale factor for coordinate keys: two decimal places (~1.1 km tolerance)
const COORD_SCALE: f64 = 100.0;

/// Identity under which a weather snapshot is cached
///
/// Two fetches for "the same place" must resolve to the same key so their
/// results merge rather than fork. City names are normalized (trimmed,
/// lowercased); coordinates are compared at centidegree resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CityKey {
    /// Normalized city name
    City(String),
    /// Coordinates in centidegrees (degrees * 100, rounded)
    Coords { lat_cd: i32, lon_cd: i32 },
}

impl CityKey {
    /// Creates a key from a city name, normalizing case and whitespace
    pub fn from_city(name: &str) -> Self {
        Self::City(name.trim().to_lowercase())
    }

    /// Creates a key from raw coordinates, rounding to centidegrees
    pub fn from_coords(lat: f64, lon: f64) -> Self {
        Self::Coords {
            lat_cd: (lat * COORD_SCALE).round() as i32,
            lon_cd: (lon * COORD_SCALE).round() as i32,
        }
    }

    /// Returns a filesystem-safe slug for use as a store key
    pub fn slug(&self) -> String {
        match self {
            Self::City(name) => name.replace([' ', ','], "_"),
            Self::Coords { lat_cd, lon_cd } => format!("coords_{}_{}", lat_cd, lon_cd),
        }
    }
}

impl std::fmt::Display for CityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::City(name) => f.write_str(name),
            Self::Coords { lat_cd, lon_cd } => write!(
                f,
                "({:.2}, {:.2})",
                *lat_cd as f64 / COORD_SCALE,
                *lon_cd as f64 / COORD_SCALE
            ),
        }
    }
}

/// A single hour of forecast data, derived from the raw feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySample {
    /// Forecast timestamp
    pub timestamp: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Display icon id from the classifier
    pub icon: String,
}

/// One calendar day of forecast data, grouped from hourly samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySample {
    /// Calendar day (UTC)
    pub date: NaiveDate,
    /// Highest temperature observed among the day's samples
    pub high_temp: f64,
    /// Lowest temperature observed among the day's samples
    pub low_temp: f64,
    /// Icon of the sample with the day's highest temperature
    pub icon: String,
}

/// A raw entry from the forecast feed, before aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct RawForecastEntry {
    /// Absolute timestamp of the forecast slot
    pub timestamp: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Condition text as reported by the provider (e.g. "Clouds")
    pub condition: String,
}

/// Current conditions for one location, as returned by the provider
///
/// The `city` field carries the provider-assigned canonical name, which is
/// used for cache keying even when the fetch was coordinate-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Canonical city name from the provider
    pub city: String,
    /// Latitude as resolved by the provider
    pub latitude: f64,
    /// Longitude as resolved by the provider
    pub longitude: f64,
    /// Current temperature in Celsius
    pub temperature: f64,
    /// Daily high in Celsius
    pub high_temp: f64,
    /// Daily low in Celsius
    pub low_temp: f64,
    /// Condition group (e.g. "Rain")
    pub condition: String,
    /// Longer condition text (e.g. "light rain")
    pub condition_description: String,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Atmospheric pressure in hPa, if reported
    pub pressure: Option<u32>,
    /// Feels-like temperature in Celsius, if reported
    pub feels_like: Option<f64>,
    /// Sunrise time, if reported
    pub sunrise: Option<DateTime<Utc>>,
    /// Sunset time, if reported
    pub sunset: Option<DateTime<Utc>>,
}

/// The reconciled weather state for one cache key
///
/// Combines current conditions with the derived hourly/daily forecast
/// views. Forecast vectors are plain values replaced wholesale on each
/// aggregation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Cache key this snapshot belongs to
    pub key: CityKey,
    /// Display city name
    pub city: String,
    /// Current temperature in Celsius
    pub temperature: f64,
    /// Daily high in Celsius
    pub high_temp: f64,
    /// Daily low in Celsius
    pub low_temp: f64,
    /// Condition group (e.g. "Clouds")
    pub condition: String,
    /// Longer condition text
    pub condition_description: String,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Atmospheric pressure in hPa, if known
    pub pressure: Option<u32>,
    /// Feels-like temperature, if known
    pub feels_like: Option<f64>,
    /// Sunrise time, if known
    pub sunrise: Option<DateTime<Utc>>,
    /// Sunset time, if known
    pub sunset: Option<DateTime<Utc>>,
    /// Latitude of the snapshot location
    pub latitude: f64,
    /// Longitude of the snapshot location
    pub longitude: f64,
    /// Hourly forecast view (24 h window), empty until the forecast leg lands
    pub hourly: Vec<HourlySample>,
    /// Daily forecast view, empty until the forecast leg lands
    pub daily: Vec<DailySample>,
    /// When this snapshot was last written
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Creates an empty snapshot with defaults for the given key
    pub fn empty(key: CityKey) -> Self {
        Self {
            key,
            city: String::new(),
            temperature: 0.0,
            high_temp: 0.0,
            low_temp: 0.0,
            condition: "Unknown".to_string(),
            condition_description: String::new(),
            humidity: 0,
            wind_speed: 0.0,
            pressure: None,
            feels_like: None,
            sunrise: None,
            sunset: None,
            latitude: 0.0,
            longitude: 0.0,
            hourly: Vec::new(),
            daily: Vec::new(),
            fetched_at: Utc::now(),
        }
    }
}

/// A partial update to a snapshot; only present fields are overwritten
#[derive(Debug, Clone, Default)]
pub struct SnapshotPatch {
    pub city: Option<String>,
    pub temperature: Option<f64>,
    pub high_temp: Option<f64>,
    pub low_temp: Option<f64>,
    pub condition: Option<String>,
    pub condition_description: Option<String>,
    pub humidity: Option<u8>,
    pub wind_speed: Option<f64>,
    pub pressure: Option<u32>,
    pub feels_like: Option<f64>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hourly: Option<Vec<HourlySample>>,
    pub daily: Option<Vec<DailySample>>,
}

impl SnapshotPatch {
    /// Builds a patch covering all current-conditions fields
    pub fn from_conditions(cond: &CurrentConditions) -> Self {
        Self {
            city: Some(cond.city.clone()),
            temperature: Some(cond.temperature),
            high_temp: Some(cond.high_temp),
            low_temp: Some(cond.low_temp),
            condition: Some(cond.condition.clone()),
            condition_description: Some(cond.condition_description.clone()),
            humidity: Some(cond.humidity),
            wind_speed: Some(cond.wind_speed),
            pressure: cond.pressure,
            feels_like: cond.feels_like,
            sunrise: cond.sunrise,
            sunset: cond.sunset,
            latitude: Some(cond.latitude),
            longitude: Some(cond.longitude),
            ..Default::default()
        }
    }

    /// Builds a patch carrying only the forecast views
    pub fn from_forecast(hourly: Vec<HourlySample>, daily: Vec<DailySample>) -> Self {
        Self {
            hourly: Some(hourly),
            daily: Some(daily),
            ..Default::default()
        }
    }
}

/// A user-curated saved city
///
/// The list is order-significant (insertion order) and deduplicated by id.
/// The id is derived from the normalized name plus centidegree coordinates,
/// so re-adding the same city is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCity {
    /// Stable opaque identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
}

impl SavedCity {
    /// Creates a saved city with a derived stable id
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        let coords = CityKey::from_coords(latitude, longitude);
        let id = format!("{}@{}", CityKey::from_city(name).slug(), coords.slug());
        Self {
            id,
            name: name.trim().to_string(),
            latitude,
            longitude,
        }
    }
}

/// An event from the device-location subsystem
///
/// The location layer itself is an external collaborator; the engine only
/// consumes its events.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    /// A coordinate fix arrived
    Fix { latitude: f64, longitude: f64 },
    /// The user denied or restricted location access
    PermissionDenied,
    /// The location service could not produce a fix
    Unavailable,
}

/// Errors that can occur across the fetch pipeline
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The query string could not be turned into a request
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Network-level failure (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider returned a non-success status code
    #[error("Server returned status {0}")]
    Server(u16),

    /// The response body did not match the expected JSON shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Location permission denied, restricted, or no fix available
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    /// No cache entry exists for the requested key
    #[error("No cached weather for {0}")]
    NotFound(String),
}
