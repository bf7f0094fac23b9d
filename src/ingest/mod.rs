/// Ingestion boundary for the air quality service.
///
/// The batch driver walks every station in the store, fetches its current
/// feed from the upstream provider, appends the resulting observations, and
/// refreshes the station's derived parameter summary. Per-station failures
/// are logged and skipped - one offline station never aborts the batch.
/// Store failures, in contrast, abort: without the source of truth there is
/// nothing useful a batch can do.
///
/// The scheduler that triggers batches periodically is an external
/// collaborator; this module only exposes the single-batch operation.

pub mod waqi;

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::config::Config;
use crate::logging;
use crate::model::{AqError, Observation};
use crate::stations::{self, SeedStation};
use crate::store::ObservationStore;
use waqi::RetryPolicy;

// ---------------------------------------------------------------------------
// Batch summary
// ---------------------------------------------------------------------------

/// Outcome of one ingestion batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Observation rows actually appended (duplicates excluded).
    pub inserted: usize,
}

// ---------------------------------------------------------------------------
// Batch driver
// ---------------------------------------------------------------------------

/// Runs one ingestion batch against the live WAQI API.
pub fn run_batch<S: ObservationStore>(
    store: &mut S,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<IngestSummary, AqError> {
    let client = waqi::http_client(config)?;
    let policy = RetryPolicy::from_config(config);
    let token = config.waqi_token.clone();
    run_batch_with(store, now, |seed| {
        waqi::fetch_with_retry(&client, &token, seed, &policy)
    })
}

/// Batch driver with an injectable fetch function, so the skip/summary
/// logic is testable without network access.
pub fn run_batch_with<S, F>(
    store: &mut S,
    now: DateTime<Utc>,
    mut fetch: F,
) -> Result<IngestSummary, AqError>
where
    S: ObservationStore,
    F: FnMut(&SeedStation) -> Result<Vec<Observation>, AqError>,
{
    let station_records = store.stations(None)?;

    let mut summary = IngestSummary {
        total: station_records.len(),
        successful: 0,
        failed: 0,
        inserted: 0,
    };

    for station in &station_records {
        let Some(seed) = stations::find_station(&station.station_id) else {
            logging::warn(
                logging::DataSource::System,
                Some(&station.station_id),
                "no provider uid known for station, skipping",
            );
            summary.failed += 1;
            continue;
        };

        let observations = match fetch(seed) {
            Ok(observations) => observations,
            Err(e) => {
                logging::log_waqi_failure(&station.station_id, "feed fetch", &e);
                summary.failed += 1;
                continue;
            }
        };

        if observations.is_empty() {
            logging::debug(
                logging::DataSource::Waqi,
                Some(&station.station_id),
                "feed returned no observations this cycle",
            );
            summary.failed += 1;
            continue;
        }

        // Append-only insert; the uniqueness constraint makes re-ingestion
        // a no-op. Store errors are fatal for the batch.
        summary.inserted += store.insert_observations(&observations)?;

        // Merge newly-seen parameters into the station's derived summary
        // and bump last_update for this batch.
        let mut params: BTreeSet<String> = station.params.iter().cloned().collect();
        params.extend(observations.iter().map(|o| o.param.clone()));
        let params: Vec<String> = params.into_iter().collect();
        store.touch_station(&station.station_id, &params, now)?;

        summary.successful += 1;
    }

    logging::log_ingest_summary(summary.total, summary.successful, summary.failed);
    Ok(summary)
}

/// Seeds an empty store with the static station registry. Idempotent.
pub fn seed_store<S: ObservationStore>(store: &mut S) -> Result<usize, AqError> {
    let seeds: Vec<_> = stations::SEED_STATIONS.iter().map(|s| s.to_station()).collect();
    store.seed_stations(&seeds)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap()
    }

    fn obs(station_id: &str, param: &str, value: f64) -> Observation {
        Observation {
            station_id: station_id.to_string(),
            ts: fixed_now(),
            param: param.to_string(),
            value,
            unit: None,
        }
    }

    #[test]
    fn test_seed_store_is_idempotent() {
        let mut store = MemoryStore::new();
        let first = seed_store(&mut store).expect("seed");
        assert_eq!(first, stations::SEED_STATIONS.len());
        assert_eq!(seed_store(&mut store).expect("reseed"), 0);
    }

    #[test]
    fn test_batch_inserts_and_touches_every_reachable_station() {
        let mut store = MemoryStore::new();
        seed_store(&mut store).expect("seed");

        let summary = run_batch_with(&mut store, fixed_now(), |seed| {
            Ok(vec![
                obs(seed.station_id, "pm25", 42.0),
                obs(seed.station_id, "aqi", 90.0),
            ])
        })
        .expect("batch");

        assert_eq!(summary.total, stations::SEED_STATIONS.len());
        assert_eq!(summary.successful, summary.total);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.inserted, summary.total * 2);

        let station_records = store.stations(None).expect("stations");
        for station in station_records {
            assert_eq!(station.params, vec!["aqi", "pm25"]);
            assert_eq!(station.last_update, Some(fixed_now()));
        }
    }

    #[test]
    fn test_one_failing_station_does_not_abort_the_batch() {
        let mut store = MemoryStore::new();
        seed_store(&mut store).expect("seed");

        let summary = run_batch_with(&mut store, fixed_now(), |seed| {
            if seed.station_id == "bandung" {
                Err(AqError::UpstreamTimeout("bandung".to_string()))
            } else {
                Ok(vec![obs(seed.station_id, "pm25", 20.0)])
            }
        })
        .expect("batch must survive a single timeout");

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.successful, summary.total - 1);

        // The timed-out station kept its pre-batch state.
        let bandung = store
            .stations(None)
            .expect("stations")
            .into_iter()
            .find(|s| s.station_id == "bandung")
            .expect("bandung seeded");
        assert!(bandung.last_update.is_none());
    }

    #[test]
    fn test_rerunning_a_batch_inserts_nothing_new() {
        let mut store = MemoryStore::new();
        seed_store(&mut store).expect("seed");

        let fetch =
            |seed: &SeedStation| -> Result<Vec<Observation>, AqError> {
                Ok(vec![obs(seed.station_id, "pm25", 42.0)])
            };

        let first = run_batch_with(&mut store, fixed_now(), fetch).expect("first batch");
        assert_eq!(first.inserted, first.total);

        let second = run_batch_with(&mut store, fixed_now(), fetch).expect("second batch");
        assert_eq!(second.inserted, 0, "identical readings are deduplicated by the store");
        assert_eq!(second.successful, second.total);
    }

    #[test]
    fn test_empty_feed_counts_as_failed_and_leaves_station_untouched() {
        let mut store = MemoryStore::new();
        seed_store(&mut store).expect("seed");

        let summary =
            run_batch_with(&mut store, fixed_now(), |_| Ok(Vec::new())).expect("batch");
        assert_eq!(summary.failed, summary.total);
        assert_eq!(summary.inserted, 0);
    }
}
