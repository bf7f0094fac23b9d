/// Latest-value aggregation.
///
/// Resolves "latest value per pollutant" from the append-only observation
/// log and merges the result with station metadata into the unified feature
/// record the dashboard consumes. All functions here are pure - the store
/// hands in snapshots, nothing holds a reference back to mutable state.
///
/// Tie-breaking: when two observations share an identical timestamp for the
/// same parameter, the one appearing later in the input slice wins. The
/// store feeds observations in insertion order, so this matches the SQL
/// path's `ts DESC, id DESC`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{LatestValue, Observation, Station, PARAM_AQI, PARAM_PM25};
use crate::risk::{self, RiskAssessment};

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Partitions observations by parameter and keeps the most recent one of
/// each partition. The result is keyed by parameter name; a parameter with
/// zero observations simply has no entry - absence is never encoded as a
/// zero value.
pub fn latest_by_parameter(observations: &[Observation]) -> BTreeMap<String, LatestValue> {
    let mut latest: BTreeMap<String, LatestValue> = BTreeMap::new();
    for obs in observations {
        match latest.get(&obs.param) {
            // Strictly-older entries are kept; equal timestamps are replaced
            // so the later-inserted row wins.
            Some(existing) if obs.ts < existing.observed_at => {}
            _ => {
                latest.insert(
                    obs.param.clone(),
                    LatestValue {
                        param: obs.param.clone(),
                        value: obs.value,
                        observed_at: obs.ts,
                    },
                );
            }
        }
    }
    latest
}

// ---------------------------------------------------------------------------
// Feature assembly
// ---------------------------------------------------------------------------

/// A station merged with its latest readings and risk classification - one
/// entry of the overview response, shaped like the GeoJSON feature the
/// original dashboard consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationFeature {
    pub station_id: String,
    pub name: String,
    pub city: String,
    /// (longitude, latitude), GeoJSON coordinate order.
    pub location: (f64, f64),
    pub params: Vec<String>,
    /// Latest value per parameter; parameters without data are absent.
    pub latest: BTreeMap<String, LatestValue>,
    pub pm25: Option<f64>,
    pub aqi: Option<f64>,
    /// Risk classification, when at least one classifiable value exists.
    pub risk: Option<RiskAssessment>,
    pub last_update: Option<DateTime<Utc>>,
}

/// Selects the risk classification for a station.
///
/// The composite AQI takes precedence when present and positive, since it
/// summarizes all pollutants; otherwise the raw PM2.5 concentration is
/// classified. With neither, the station is reported without a category,
/// never with a fabricated "Good".
pub fn risk_for(aqi: Option<f64>, pm25: Option<f64>) -> Option<RiskAssessment> {
    match aqi {
        Some(index) if index > 0.0 => Some(risk::categorize(index, risk::aqi_index_table())),
        _ => pm25.map(|c| risk::categorize(c, risk::pm25_table())),
    }
}

/// Builds the unified feature record for one station from its latest
/// per-parameter values.
pub fn build_feature(station: &Station, latest: BTreeMap<String, LatestValue>) -> StationFeature {
    let pm25 = latest.get(PARAM_PM25).map(|v| v.value);
    let aqi = latest.get(PARAM_AQI).map(|v| v.value);
    let risk = risk_for(aqi, pm25);

    StationFeature {
        station_id: station.station_id.clone(),
        name: station.name.clone(),
        city: station.city.clone(),
        location: (station.longitude, station.latitude),
        params: station.params.clone(),
        latest,
        pm25,
        aqi,
        risk,
        last_update: station.last_update,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
