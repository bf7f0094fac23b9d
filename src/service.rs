/// Query surface exposed to the API/dashboard boundary.
///
/// Each method is one logical request-driven operation: read a snapshot from
/// the store, derive a fresh value, and hand it back. Derived views are
/// memoized through the cache layer keyed by every parameter that affects
/// the result. Operations are independent of each other; nothing here holds
/// state beyond the injected store, cache, and configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::interpolation::{self, HeatmapPoint};
use crate::analysis::latest::{build_feature, StationFeature};
use crate::cache::{cache_key, Cache};
use crate::config::Config;
use crate::model::{AqError, BoundingBox, LatestValue, TimePoint};
use crate::risk::{self, RiskAssessment};
use crate::store::ObservationStore;

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// Interpolated heatmap for one parameter, in the sparse point form the
/// dashboard heat layer takes. Cells without coverage are omitted entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    pub param: String,
    pub resolution: usize,
    pub bbox: BoundingBox,
    pub points: Vec<HeatmapPoint>,
}

/// Latest observations for a single station, keyed by parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationLatest {
    pub station_id: String,
    pub latest: BTreeMap<String, LatestValue>,
}

/// Historical values for one (station, parameter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeseries {
    pub station_id: String,
    pub param: String,
    pub series: Vec<TimePoint>,
}

/// Component connectivity report for the health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
    pub cache: String,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct AirQualityService<S: ObservationStore> {
    store: S,
    cache: Cache,
    config: Config,
}

impl<S: ObservationStore> AirQualityService<S> {
    pub fn new(store: S, cache: Cache, config: Config) -> AirQualityService<S> {
        AirQualityService { store, cache, config }
    }

    /// Stations with their latest values and risk classification, optionally
    /// restricted to a bounding box.
    ///
    /// Stations without data appear with explicit absent fields - a partial
    /// batch never aborts the whole response.
    pub fn stations_overview(
        &mut self,
        bbox: Option<BoundingBox>,
        force_refresh: bool,
    ) -> Result<Vec<StationFeature>, AqError> {
        let key = cache_key(&[
            "stations".to_string(),
            bbox_fragment(bbox.as_ref()),
        ]);
        let ttl = self.config.cache_ttl_secs;
        let store = &mut self.store;
        self.cache
            .get_or_compute(&key, ttl, force_refresh, || compute_overview(store, bbox))
    }

    /// Interpolated heatmap for one parameter at the given grid resolution.
    ///
    /// Fails with `InsufficientData` when fewer than 3 stations currently
    /// report the parameter - the client-correctable "coverage too sparse"
    /// condition.
    pub fn heatmap(
        &mut self,
        param: &str,
        resolution: usize,
        force_refresh: bool,
    ) -> Result<Heatmap, AqError> {
        let padding = self.config.heatmap_padding_deg;
        let key = cache_key(&[
            "heatmap".to_string(),
            param.to_string(),
            resolution.to_string(),
            padding.to_string(),
        ]);
        let ttl = self.config.cache_ttl_secs;
        let store = &mut self.store;
        self.cache.get_or_compute(&key, ttl, force_refresh, || {
            let samples = store.latest_samples(param)?;
            let grid = interpolation::interpolate(&samples, resolution, padding)?;
            Ok(Heatmap {
                param: param.to_string(),
                resolution,
                bbox: grid.bbox,
                points: grid.points(),
            })
        })
    }

    /// Latest value per parameter for one station. A station with no
    /// observations at all is `NoData` - the single-station 404 equivalent.
    pub fn latest_for_station(&mut self, station_id: &str) -> Result<StationLatest, AqError> {
        let values = self.store.latest_values(station_id)?;
        if values.is_empty() {
            return Err(AqError::NoData(station_id.to_string()));
        }
        let latest = values.into_iter().map(|v| (v.param.clone(), v)).collect();
        Ok(StationLatest { station_id: station_id.to_string(), latest })
    }

    /// Historical values for one (station, parameter), ascending, bounded
    /// by `limit`.
    pub fn timeseries(
        &mut self,
        station_id: &str,
        param: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Timeseries, AqError> {
        let series = self.store.timeseries(station_id, param, start, end, limit)?;
        Ok(Timeseries {
            station_id: station_id.to_string(),
            param: param.to_string(),
            series,
        })
    }

    /// Health-risk assessment for a raw PM2.5 concentration.
    pub fn health_risk(pm25_value: f64) -> RiskAssessment {
        risk::categorize(pm25_value, risk::pm25_table())
    }

    /// Connectivity check. A dead store is service-unavailable; a dead
    /// cache only degrades.
    pub fn health(&mut self) -> Result<HealthStatus, AqError> {
        self.store.ping()?;
        let cache_status = if self.cache.probe() { "connected" } else { "degraded" };
        Ok(HealthStatus {
            status: "ok".to_string(),
            database: "connected".to_string(),
            cache: cache_status.to_string(),
        })
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

fn compute_overview<S: ObservationStore>(
    store: &mut S,
    bbox: Option<BoundingBox>,
) -> Result<Vec<StationFeature>, AqError> {
    let stations = store.stations(bbox.as_ref())?;
    let mut features = Vec::with_capacity(stations.len());
    for station in &stations {
        let values = store.latest_values(&station.station_id)?;
        let latest: BTreeMap<String, LatestValue> =
            values.into_iter().map(|v| (v.param.clone(), v)).collect();
        features.push(build_feature(station, latest));
    }
    Ok(features)
}

fn bbox_fragment(bbox: Option<&BoundingBox>) -> String {
    match bbox {
        Some(b) => format!("{}:{}:{}:{}", b.lon_min, b.lat_min, b.lon_max, b.lat_max),
        None => "None".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Observation, Station};
    use crate::risk::RiskCategory;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap()
    }

    fn station(id: &str, lon: f64, lat: f64) -> Station {
        Station {
            station_id: id.to_string(),
            name: id.to_string(),
            city: "Jakarta".to_string(),
            longitude: lon,
            latitude: lat,
            params: vec!["pm25".to_string()],
            last_update: Some(fixed_now()),
        }
    }

    fn obs(id: &str, param: &str, value: f64) -> Observation {
        Observation {
            station_id: id.to_string(),
            ts: fixed_now(),
            param: param.to_string(),
            value,
            unit: None,
        }
    }

    fn service_with_three_stations() -> AirQualityService<MemoryStore> {
        let mut store = MemoryStore::new();
        store
            .seed_stations(&[
                station("a", 106.8, -6.2),
                station("b", 107.0, -6.0),
                station("c", 106.5, -6.4),
            ])
            .unwrap();
        store
            .insert_observations(&[
                obs("a", "pm25", 10.0),
                obs("b", "pm25", 20.0),
                obs("c", "pm25", 50.0),
            ])
            .unwrap();
        AirQualityService::new(store, Cache::in_memory(), Config::default())
    }

    #[test]
    fn test_overview_classifies_each_station_from_its_pm25() {
        let mut service = service_with_three_stations();
        let features = service.stations_overview(None, false).expect("overview");
        assert_eq!(features.len(), 3);

        let categories: Vec<RiskCategory> = features
            .iter()
            .map(|f| f.risk.as_ref().expect("pm25 present").category)
            .collect();
        assert_eq!(
            categories,
            vec![
                RiskCategory::Good,
                RiskCategory::Moderate,
                RiskCategory::UnhealthyForSensitiveGroups
            ]
        );
    }

    #[test]
    fn test_overview_with_bbox_uses_a_distinct_cache_entry() {
        let mut service = service_with_three_stations();
        let all = service.stations_overview(None, false).expect("overview");
        assert_eq!(all.len(), 3);

        let bbox = BoundingBox {
            lon_min: 106.7,
            lat_min: -6.3,
            lon_max: 107.1,
            lat_max: -5.9,
        };
        let some = service.stations_overview(Some(bbox), false).expect("bbox overview");
        assert_eq!(some.len(), 2, "bbox must not be served from the unbounded cache entry");
    }

    #[test]
    fn test_overview_is_served_from_cache_until_forced() {
        let mut service = service_with_three_stations();
        service.stations_overview(None, false).expect("prime cache");

        // New data arrives; the cached view intentionally lags.
        service
            .store_mut()
            .insert_observations(&[Observation {
                ts: fixed_now() + chrono::Duration::minutes(5),
                ..obs("a", "pm25", 90.0)
            }])
            .unwrap();

        let cached = service.stations_overview(None, false).expect("cached");
        let a = cached.iter().find(|f| f.station_id == "a").unwrap();
        assert_eq!(a.pm25, Some(10.0));

        let fresh = service.stations_overview(None, true).expect("forced");
        let a = fresh.iter().find(|f| f.station_id == "a").unwrap();
        assert_eq!(a.pm25, Some(90.0));
    }

    #[test]
    fn test_station_without_data_appears_with_absent_fields() {
        let mut service = service_with_three_stations();
        service
            .store_mut()
            .seed_stations(&[station("silent", 106.9, -6.1)])
            .unwrap();

        let features = service.stations_overview(None, false).expect("overview");
        let silent = features.iter().find(|f| f.station_id == "silent").expect("listed");
        assert!(silent.pm25.is_none());
        assert!(silent.risk.is_none());
    }

    #[test]
    fn test_heatmap_interpolates_the_latest_values() {
        let mut service = service_with_three_stations();
        let heatmap = service.heatmap("pm25", 10, false).expect("heatmap");
        assert_eq!(heatmap.resolution, 10);
        assert!(!heatmap.points.is_empty());
        for p in &heatmap.points {
            assert!((10.0 - 1e-6..=50.0 + 1e-6).contains(&p.value));
            assert!(heatmap.bbox.contains(p.lon, p.lat));
        }
    }

    #[test]
    fn test_heatmap_with_sparse_coverage_is_client_correctable() {
        let mut store = MemoryStore::new();
        store
            .seed_stations(&[station("a", 106.8, -6.2), station("b", 107.0, -6.0)])
            .unwrap();
        store
            .insert_observations(&[obs("a", "pm25", 10.0), obs("b", "pm25", 20.0)])
            .unwrap();
        let mut service = AirQualityService::new(store, Cache::in_memory(), Config::default());

        assert_eq!(
            service.heatmap("pm25", 10, false).err(),
            Some(AqError::InsufficientData { have: 2, need: 3 })
        );
    }

    #[test]
    fn test_latest_for_unknown_station_is_no_data() {
        let mut service = service_with_three_stations();
        assert_eq!(
            service.latest_for_station("nowhere").err(),
            Some(AqError::NoData("nowhere".to_string()))
        );
    }

    #[test]
    fn test_latest_for_station_returns_per_parameter_map() {
        let mut service = service_with_three_stations();
        service
            .store_mut()
            .insert_observations(&[obs("a", "o3", 31.0)])
            .unwrap();

        let latest = service.latest_for_station("a").expect("latest");
        assert_eq!(latest.latest.len(), 2);
        assert_eq!(latest.latest["pm25"].value, 10.0);
        assert_eq!(latest.latest["o3"].value, 31.0);
    }

    #[test]
    fn test_health_risk_uses_the_pm25_table() {
        let risk = AirQualityService::<MemoryStore>::health_risk(300.0);
        assert_eq!(risk.category, RiskCategory::Hazardous);
        assert_eq!(risk.color, "#7e0023");
    }

    #[test]
    fn test_health_reports_connected_components() {
        let mut service = service_with_three_stations();
        let health = service.health().expect("healthy");
        assert_eq!(health.status, "ok");
        assert_eq!(health.database, "connected");
        assert_eq!(health.cache, "connected");
    }
}
