/// Persistent store access.
///
/// The relational store is the single source of truth: stations plus an
/// append-only observation log. All access goes through the
/// `ObservationStore` trait so the service layer and tests can run against
/// either the real PostgreSQL store or the in-memory substitute.
///
/// Writes are idempotent by construction - observation inserts carry a
/// uniqueness constraint on (station_id, ts, param) and conflicting rows are
/// dropped, so re-ingesting a batch is a no-op. Readers only ever see
/// snapshot-consistent queries; nothing here mutates derived data in place.

use chrono::{DateTime, Utc};
use postgres::{Client, NoTls};

use crate::config::Config;
use crate::model::{AqError, BoundingBox, LatestValue, Observation, Sample, Station, TimePoint};

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Query and ingest surface over the persistent store.
///
/// Tie-breaking rule: when two observations share an identical timestamp for
/// the same (station, param), the most recently inserted row wins. The SQL
/// path orders by `ts DESC, id DESC`; the in-memory path keeps insertion
/// order and lets later entries replace earlier ones.
pub trait ObservationStore {
    /// Inserts stations that are not yet present. Returns how many rows were
    /// actually inserted.
    fn seed_stations(&mut self, stations: &[Station]) -> Result<usize, AqError>;

    /// All stations, optionally restricted to a bounding box.
    fn stations(&mut self, bbox: Option<&BoundingBox>) -> Result<Vec<Station>, AqError>;

    /// Appends a batch of observations, skipping duplicates. Returns how
    /// many rows were actually inserted.
    fn insert_observations(&mut self, observations: &[Observation]) -> Result<usize, AqError>;

    /// Updates a station's derived parameter summary and bumps last_update.
    fn touch_station(
        &mut self,
        station_id: &str,
        params: &[String],
        last_update: DateTime<Utc>,
    ) -> Result<(), AqError>;

    /// Latest value per parameter for one station. An empty vec means the
    /// station has no observations at all.
    fn latest_values(&mut self, station_id: &str) -> Result<Vec<LatestValue>, AqError>;

    /// Latest value of one parameter across all stations that report it,
    /// joined with station coordinates - the interpolator's input.
    fn latest_samples(&mut self, param: &str) -> Result<Vec<Sample>, AqError>;

    /// Historical values for one (station, param), ascending by timestamp.
    fn timeseries(
        &mut self,
        station_id: &str,
        param: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<TimePoint>, AqError>;

    /// Cheap connectivity check for the health endpoint.
    fn ping(&mut self) -> Result<(), AqError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL store
// ---------------------------------------------------------------------------

pub struct PgStore {
    client: Client,
}

impl PgStore {
    /// Opens a connection using the explicit configuration object. The
    /// caller owns the store's lifecycle; dropping it closes the connection.
    pub fn connect(config: &Config) -> Result<PgStore, AqError> {
        let client = Client::connect(&config.connection_string(), NoTls).map_err(store_err)?;
        Ok(PgStore { client })
    }
}

fn store_err(e: postgres::Error) -> AqError {
    AqError::StoreUnavailable(e.to_string())
}

impl ObservationStore for PgStore {
    fn seed_stations(&mut self, stations: &[Station]) -> Result<usize, AqError> {
        let mut inserted = 0;
        for s in stations {
            inserted += self
                .client
                .execute(
                    "INSERT INTO stations (station_id, name, city, longitude, latitude, params)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     ON CONFLICT (station_id) DO NOTHING",
                    &[
                        &s.station_id,
                        &s.name,
                        &s.city,
                        &s.longitude,
                        &s.latitude,
                        &s.params,
                    ],
                )
                .map_err(store_err)? as usize;
        }
        Ok(inserted)
    }

    fn stations(&mut self, bbox: Option<&BoundingBox>) -> Result<Vec<Station>, AqError> {
        let rows = match bbox {
            Some(b) => self
                .client
                .query(
                    "SELECT station_id, name, city, longitude, latitude, params, last_update
                     FROM stations
                     WHERE longitude BETWEEN $1 AND $2 AND latitude BETWEEN $3 AND $4
                     ORDER BY station_id",
                    &[&b.lon_min, &b.lon_max, &b.lat_min, &b.lat_max],
                )
                .map_err(store_err)?,
            None => self
                .client
                .query(
                    "SELECT station_id, name, city, longitude, latitude, params, last_update
                     FROM stations
                     ORDER BY station_id",
                    &[],
                )
                .map_err(store_err)?,
        };

        Ok(rows
            .into_iter()
            .map(|row| Station {
                station_id: row.get(0),
                name: row.get(1),
                city: row.get(2),
                longitude: row.get(3),
                latitude: row.get(4),
                params: row.get(5),
                last_update: row.get(6),
            })
            .collect())
    }

    fn insert_observations(&mut self, observations: &[Observation]) -> Result<usize, AqError> {
        let mut inserted = 0;
        for obs in observations {
            inserted += self
                .client
                .execute(
                    "INSERT INTO observations (station_id, ts, param, value, unit)
                     VALUES ($1, $2, $3, $4, $5)
                     ON CONFLICT (station_id, ts, param) DO NOTHING",
                    &[&obs.station_id, &obs.ts, &obs.param, &obs.value, &obs.unit],
                )
                .map_err(store_err)? as usize;
        }
        Ok(inserted)
    }

    fn touch_station(
        &mut self,
        station_id: &str,
        params: &[String],
        last_update: DateTime<Utc>,
    ) -> Result<(), AqError> {
        let params_vec: Vec<String> = params.to_vec();
        self.client
            .execute(
                "UPDATE stations SET params = $2, last_update = $3 WHERE station_id = $1",
                &[&station_id, &params_vec, &last_update],
            )
            .map_err(store_err)?;
        Ok(())
    }

    fn latest_values(&mut self, station_id: &str) -> Result<Vec<LatestValue>, AqError> {
        let rows = self
            .client
            .query(
                "SELECT DISTINCT ON (param) param, value, ts
                 FROM observations
                 WHERE station_id = $1
                 ORDER BY param, ts DESC, id DESC",
                &[&station_id],
            )
            .map_err(store_err)?;

        Ok(rows
            .into_iter()
            .map(|row| LatestValue {
                param: row.get(0),
                value: row.get(1),
                observed_at: row.get(2),
            })
            .collect())
    }

    fn latest_samples(&mut self, param: &str) -> Result<Vec<Sample>, AqError> {
        let rows = self
            .client
            .query(
                "SELECT DISTINCT ON (o.station_id) o.station_id, s.longitude, s.latitude, o.value
                 FROM observations o
                 JOIN stations s ON s.station_id = o.station_id
                 WHERE o.param = $1
                 ORDER BY o.station_id, o.ts DESC, o.id DESC",
                &[&param],
            )
            .map_err(store_err)?;

        Ok(rows
            .into_iter()
            .map(|row| Sample {
                station_id: row.get(0),
                longitude: row.get(1),
                latitude: row.get(2),
                value: row.get(3),
            })
            .collect())
    }

    fn timeseries(
        &mut self,
        station_id: &str,
        param: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<TimePoint>, AqError> {
        // Four start/end combinations; static statements keep the
        // parameter indices honest.
        let rows = match (start, end) {
            (Some(s), Some(e)) => self
                .client
                .query(
                    "SELECT ts, value FROM observations
                     WHERE station_id = $1 AND param = $2 AND ts >= $3 AND ts <= $4
                     ORDER BY ts ASC LIMIT $5",
                    &[&station_id, &param, &s, &e, &limit],
                )
                .map_err(store_err)?,
            (Some(s), None) => self
                .client
                .query(
                    "SELECT ts, value FROM observations
                     WHERE station_id = $1 AND param = $2 AND ts >= $3
                     ORDER BY ts ASC LIMIT $4",
                    &[&station_id, &param, &s, &limit],
                )
                .map_err(store_err)?,
            (None, Some(e)) => self
                .client
                .query(
                    "SELECT ts, value FROM observations
                     WHERE station_id = $1 AND param = $2 AND ts <= $3
                     ORDER BY ts ASC LIMIT $4",
                    &[&station_id, &param, &e, &limit],
                )
                .map_err(store_err)?,
            (None, None) => self
                .client
                .query(
                    "SELECT ts, value FROM observations
                     WHERE station_id = $1 AND param = $2
                     ORDER BY ts ASC LIMIT $3",
                    &[&station_id, &param, &limit],
                )
                .map_err(store_err)?,
        };

        Ok(rows
            .into_iter()
            .map(|row| TimePoint {
                ts: row.get(0),
                value: row.get(1),
            })
            .collect())
    }

    fn ping(&mut self) -> Result<(), AqError> {
        self.client.query_one("SELECT 1", &[]).map_err(store_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// In-memory `ObservationStore` for development and tests.
///
/// Mirrors the PostgreSQL semantics exactly: duplicate observation inserts
/// are no-ops, and latest-value ties on identical timestamps resolve to the
/// most recently inserted row.
#[derive(Default)]
pub struct MemoryStore {
    stations: Vec<Station>,
    observations: Vec<Observation>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }
}

impl ObservationStore for MemoryStore {
    fn seed_stations(&mut self, stations: &[Station]) -> Result<usize, AqError> {
        let mut inserted = 0;
        for s in stations {
            if !self.stations.iter().any(|e| e.station_id == s.station_id) {
                self.stations.push(s.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn stations(&mut self, bbox: Option<&BoundingBox>) -> Result<Vec<Station>, AqError> {
        let mut out: Vec<Station> = self
            .stations
            .iter()
            .filter(|s| match bbox {
                Some(b) => b.contains(s.longitude, s.latitude),
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.station_id.cmp(&b.station_id));
        Ok(out)
    }

    fn insert_observations(&mut self, observations: &[Observation]) -> Result<usize, AqError> {
        let mut inserted = 0;
        for obs in observations {
            let duplicate = self.observations.iter().any(|e| {
                e.station_id == obs.station_id && e.ts == obs.ts && e.param == obs.param
            });
            if !duplicate {
                self.observations.push(obs.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn touch_station(
        &mut self,
        station_id: &str,
        params: &[String],
        last_update: DateTime<Utc>,
    ) -> Result<(), AqError> {
        if let Some(s) = self.stations.iter_mut().find(|s| s.station_id == station_id) {
            s.params = params.to_vec();
            s.last_update = Some(last_update);
        }
        Ok(())
    }

    fn latest_values(&mut self, station_id: &str) -> Result<Vec<LatestValue>, AqError> {
        let station_obs: Vec<Observation> = self
            .observations
            .iter()
            .filter(|o| o.station_id == station_id)
            .cloned()
            .collect();
        let grouped = crate::analysis::latest::latest_by_parameter(&station_obs);
        Ok(grouped.into_values().collect())
    }

    fn latest_samples(&mut self, param: &str) -> Result<Vec<Sample>, AqError> {
        let mut samples = Vec::new();
        for station in &self.stations {
            let mut latest: Option<&Observation> = None;
            for obs in &self.observations {
                if obs.station_id != station.station_id || obs.param != param {
                    continue;
                }
                // >= lets a later-inserted row win an exact timestamp tie.
                match latest {
                    Some(prev) if obs.ts < prev.ts => {}
                    _ => latest = Some(obs),
                }
            }
            if let Some(obs) = latest {
                samples.push(Sample {
                    station_id: station.station_id.clone(),
                    longitude: station.longitude,
                    latitude: station.latitude,
                    value: obs.value,
                });
            }
        }
        Ok(samples)
    }

    fn timeseries(
        &mut self,
        station_id: &str,
        param: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<TimePoint>, AqError> {
        let mut points: Vec<TimePoint> = self
            .observations
            .iter()
            .filter(|o| o.station_id == station_id && o.param == param)
            .filter(|o| start.is_none_or(|s| o.ts >= s))
            .filter(|o| end.is_none_or(|e| o.ts <= e))
            .map(|o| TimePoint { ts: o.ts, value: o.value })
            .collect();
        points.sort_by_key(|p| p.ts);
        points.truncate(limit.max(0) as usize);
        Ok(points)
    }

    fn ping(&mut self) -> Result<(), AqError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
