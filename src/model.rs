/// Core data types for the air quality monitoring service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O and no logic beyond trivial accessors - only types and
/// the crate-wide error enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameter names
// ---------------------------------------------------------------------------

/// WAQI parameter key for fine particulate matter (µg/m³), the primary
/// pollutant for health-risk classification.
pub const PARAM_PM25: &str = "pm25";

/// Synthetic parameter key under which the composite AQI score is stored
/// alongside the per-pollutant readings.
pub const PARAM_AQI: &str = "aqi";

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// A single pollutant reading ingested from the upstream provider.
///
/// Observations form an append-only log. At most one row exists per
/// (station_id, ts, param); re-ingesting an identical reading is a no-op
/// at the store layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub station_id: String,
    pub ts: DateTime<Utc>,
    pub param: String,
    pub value: f64,
    pub unit: Option<String>,
}

/// The most recent observation for one (station, parameter) pair.
///
/// Derived on demand by `analysis::latest` or by the store's
/// `DISTINCT ON` query - never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestValue {
    pub param: String,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

/// One point of a historical timeseries query, ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub ts: DateTime<Utc>,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Station types
// ---------------------------------------------------------------------------

/// A monitoring station as held by the persistent store.
///
/// `params` is a derived summary of which parameters have ever been observed
/// at this station; `last_update` is bumped on each ingested batch. Both are
/// maintained by the ingestion path, not by readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub station_id: String,
    pub name: String,
    pub city: String,
    /// WGS84 longitude.
    pub longitude: f64,
    /// WGS84 latitude.
    pub latitude: f64,
    pub params: Vec<String>,
    pub last_update: Option<DateTime<Utc>>,
}

/// Axis-aligned geographic bounding box (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max && lat >= self.lat_min && lat <= self.lat_max
    }
}

/// One scattered sample for spatial interpolation: a station location and
/// the latest value of the requested parameter there.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub station_id: String,
    pub longitude: f64,
    pub latitude: f64,
    pub value: f64,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when querying the store, the upstream provider,
/// or the analysis pipeline.
#[derive(Debug, PartialEq)]
pub enum AqError {
    /// Fewer spatial samples than the interpolator needs (minimum 3).
    /// Client-correctable: coverage for the requested parameter is too sparse.
    InsufficientData { have: usize, need: usize },
    /// Requested grid resolution cannot form a surface (minimum 2 per axis).
    InvalidResolution(usize),
    /// The station has no observations for the requested parameter.
    NoData(String),
    /// The upstream provider did not answer within the configured deadline.
    /// Recovered locally - the station is skipped for this cycle.
    UpstreamTimeout(String),
    /// Non-2xx HTTP response from the upstream provider.
    HttpError(u16),
    /// An upstream response body could not be deserialized.
    ParseError(String),
    /// The persistent store is unreachable. Fatal for any operation that
    /// depends on it.
    StoreUnavailable(String),
}

impl std::fmt::Display for AqError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AqError::InsufficientData { have, need } => {
                write!(f, "Insufficient data: {} samples, need at least {}", have, need)
            }
            AqError::InvalidResolution(n) => {
                write!(f, "Invalid grid resolution: {} (minimum 2)", n)
            }
            AqError::NoData(station) => write!(f, "No observations for station: {}", station),
            AqError::UpstreamTimeout(station) => {
                write!(f, "Upstream fetch timed out for station: {}", station)
            }
            AqError::HttpError(code) => write!(f, "HTTP error: {}", code),
            AqError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AqError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for AqError {}
