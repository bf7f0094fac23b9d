/// WAQI (World Air Quality Index, aqicn.org) feed API client.
///
/// Retrieves the current observation feed for a station, either by its
/// numeric uid or - when the uid feed comes back empty - by geographic
/// coordinates. One feed yields a batch of `Observation`s: one per pollutant
/// in the `iaqi` map plus a synthetic row for the composite AQI when the
/// provider reports a numeric index.
///
/// API documentation: https://aqicn.org/json-api/doc/

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::Config;
use crate::model::{AqError, Observation, PARAM_AQI};
use crate::stations::SeedStation;

const WAQI_BASE_URL: &str = "https://api.waqi.info";

// ============================================================================
// WAQI API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct WaqiResponse {
    pub status: String,
    pub data: Option<WaqiFeed>,
}

#[derive(Debug, Deserialize)]
pub struct WaqiFeed {
    /// Composite AQI. A number under normal conditions, the string "-" when
    /// the station has no current index.
    pub aqi: serde_json::Value,
    pub time: WaqiTime,
    /// Per-pollutant index values keyed by parameter name (pm25, pm10, o3, ...).
    #[serde(default)]
    pub iaqi: BTreeMap<String, WaqiMeasurement>,
}

#[derive(Debug, Deserialize)]
pub struct WaqiTime {
    /// ISO 8601 observation timestamp, e.g. "2026-08-30T10:00:00+07:00".
    pub iso: String,
}

#[derive(Debug, Deserialize)]
pub struct WaqiMeasurement {
    pub v: f64,
}

// ============================================================================
// Retry policy
// ============================================================================

/// Bounded retry with exponential backoff for transient upstream failures.
///
/// Timeouts are NOT retried inline - the station is skipped this cycle and
/// picked up again on the next scheduled run. Only transient server errors
/// (HTTP 5xx) back off and retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> RetryPolicy {
        RetryPolicy {
            max_attempts: config.retry_max_attempts.max(1),
            base_backoff_ms: config.retry_base_backoff_ms,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(1 << attempt.min(10)))
    }
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Builds a blocking HTTP client with the configured per-request deadline.
pub fn http_client(config: &Config) -> Result<reqwest::blocking::Client, AqError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .build()
        .map_err(|e| AqError::ParseError(format!("failed to build http client: {}", e)))
}

pub fn build_feed_url(token: &str, uid: i64) -> String {
    format!("{}/feed/@{}/?token={}", WAQI_BASE_URL, uid, token)
}

pub fn build_geo_url(token: &str, lat: f64, lon: f64) -> String {
    format!("{}/feed/geo:{};{}/?token={}", WAQI_BASE_URL, lat, lon, token)
}

/// Fetches the current feed for a seed station.
///
/// Tries the uid feed first and falls back to a coordinate lookup when the
/// uid feed reports a non-ok status, mirroring stations whose uid has been
/// renumbered by the provider.
pub fn fetch_feed(
    client: &reqwest::blocking::Client,
    token: &str,
    station: &SeedStation,
) -> Result<Vec<Observation>, AqError> {
    let by_uid = request_feed(client, &build_feed_url(token, station.uid), station.station_id);
    match by_uid {
        Ok(feed) => parse_feed(station.station_id, &feed),
        Err(AqError::NoData(_)) => {
            let url = build_geo_url(token, station.latitude, station.longitude);
            let feed = request_feed(client, &url, station.station_id)?;
            parse_feed(station.station_id, &feed)
        }
        Err(e) => Err(e),
    }
}

/// Fetches with the bounded retry policy. Timeouts skip immediately;
/// HTTP 5xx responses back off exponentially up to `max_attempts`.
pub fn fetch_with_retry(
    client: &reqwest::blocking::Client,
    token: &str,
    station: &SeedStation,
    policy: &RetryPolicy,
) -> Result<Vec<Observation>, AqError> {
    let mut attempt = 0;
    loop {
        match fetch_feed(client, token, station) {
            Err(AqError::HttpError(code)) if code >= 500 && attempt + 1 < policy.max_attempts => {
                std::thread::sleep(policy.backoff(attempt));
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn request_feed(
    client: &reqwest::blocking::Client,
    url: &str,
    station_id: &str,
) -> Result<WaqiFeed, AqError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .map_err(|e| {
            if e.is_timeout() {
                AqError::UpstreamTimeout(station_id.to_string())
            } else {
                AqError::ParseError(format!("request failed: {}", e))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AqError::HttpError(status.as_u16()));
    }

    let body: WaqiResponse = response
        .json()
        .map_err(|e| AqError::ParseError(format!("invalid feed body: {}", e)))?;

    if body.status != "ok" {
        return Err(AqError::NoData(format!(
            "{} (feed status was not ok: {})",
            station_id, body.status
        )));
    }
    body.data
        .ok_or_else(|| AqError::NoData(format!("{} (feed status ok but no data)", station_id)))
}

// ============================================================================
// Feed parsing
// ============================================================================

/// Converts one feed into observation rows at the feed's own timestamp.
pub fn parse_feed(station_id: &str, feed: &WaqiFeed) -> Result<Vec<Observation>, AqError> {
    let ts = parse_feed_time(&feed.time.iso)?;

    let mut observations = Vec::with_capacity(feed.iaqi.len() + 1);
    for (param, measurement) in &feed.iaqi {
        observations.push(Observation {
            station_id: station_id.to_string(),
            ts,
            param: param.clone(),
            value: measurement.v,
            unit: None,
        });
    }

    // The composite index is stored under its own synthetic parameter.
    // A non-numeric aqi ("-") means the provider has no current index;
    // that is absence, not zero.
    if let Some(index) = feed.aqi.as_f64() {
        observations.push(Observation {
            station_id: station_id.to_string(),
            ts,
            param: PARAM_AQI.to_string(),
            value: index,
            unit: None,
        });
    }

    Ok(observations)
}

fn parse_feed_time(iso: &str) -> Result<DateTime<Utc>, AqError> {
    DateTime::parse_from_rfc3339(iso)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AqError::ParseError(format!("bad feed timestamp '{}': {}", iso, e)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn feed_from_json(raw: &str) -> WaqiFeed {
        let response: WaqiResponse = serde_json::from_str(raw).expect("valid test json");
        response.data.expect("test json carries data")
    }

    #[test]
    fn test_parse_feed_extracts_pollutants_and_aqi() {
        let feed = feed_from_json(
            r#"{
                "status": "ok",
                "data": {
                    "aqi": 75,
                    "time": { "iso": "2026-08-30T10:00:00+07:00" },
                    "iaqi": {
                        "pm25": { "v": 75.0 },
                        "pm10": { "v": 40.0 },
                        "o3": { "v": 12.5 }
                    }
                }
            }"#,
        );

        let observations = parse_feed("jakarta-south", &feed).expect("parse");
        assert_eq!(observations.len(), 4, "three pollutants plus the composite aqi");

        let aqi = observations.iter().find(|o| o.param == "aqi").expect("aqi row");
        assert_eq!(aqi.value, 75.0);

        // +07:00 local converts to UTC.
        let expected_ts = Utc.with_ymd_and_hms(2026, 8, 30, 3, 0, 0).unwrap();
        assert!(observations.iter().all(|o| o.ts == expected_ts));
        assert!(observations.iter().all(|o| o.station_id == "jakarta-south"));
    }

    #[test]
    fn test_dash_aqi_is_absence_not_zero() {
        let feed = feed_from_json(
            r#"{
                "status": "ok",
                "data": {
                    "aqi": "-",
                    "time": { "iso": "2026-08-30T10:00:00+00:00" },
                    "iaqi": { "pm25": { "v": 18.0 } }
                }
            }"#,
        );

        let observations = parse_feed("bandung", &feed).expect("parse");
        assert_eq!(observations.len(), 1);
        assert!(
            observations.iter().all(|o| o.param != "aqi"),
            "a '-' index must produce no aqi observation at all"
        );
    }

    #[test]
    fn test_unparseable_timestamp_is_a_parse_error() {
        let feed = feed_from_json(
            r#"{
                "status": "ok",
                "data": {
                    "aqi": 10,
                    "time": { "iso": "yesterday-ish" },
                    "iaqi": {}
                }
            }"#,
        );

        match parse_feed("bandung", &feed) {
            Err(AqError::ParseError(msg)) => assert!(msg.contains("yesterday-ish")),
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_iaqi_with_numeric_index_still_yields_the_index() {
        let feed = feed_from_json(
            r#"{
                "status": "ok",
                "data": {
                    "aqi": 42,
                    "time": { "iso": "2026-08-30T10:00:00+00:00" },
                    "iaqi": {}
                }
            }"#,
        );

        let observations = parse_feed("semarang", &feed).expect("parse");
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].param, "aqi");
        assert_eq!(observations[0].value, 42.0);
    }

    #[test]
    fn test_feed_urls_embed_token_and_identity() {
        assert_eq!(
            build_feed_url("tok", 1666),
            "https://api.waqi.info/feed/@1666/?token=tok"
        );
        assert_eq!(
            build_geo_url("tok", -6.182, 106.8283),
            "https://api.waqi.info/feed/geo:-6.182;106.8283/?token=tok"
        );
    }

    #[test]
    fn test_backoff_grows_exponentially_and_saturates() {
        let policy = RetryPolicy { max_attempts: 5, base_backoff_ms: 100 };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        // Shift is capped so huge attempt counts cannot overflow.
        assert_eq!(policy.backoff(40), Duration::from_millis(100 * 1024));
    }
}
