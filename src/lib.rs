/// Air quality monitoring service.
///
/// Ingests station observations from the WAQI feed API into PostgreSQL and
/// serves derived views over them: per-station latest values with health
/// risk classification, interpolated heatmap grids, and historical
/// timeseries. Derived views are memoized through a pluggable cache with a
/// short TTL.
///
/// Module map:
/// - `model`      shared data types and the error taxonomy
/// - `config`     environment/TOML configuration
/// - `logging`    leveled logger with failure classification
/// - `stations`   seed registry of monitored stations
/// - `store`      persistence trait, PostgreSQL and in-memory backends
/// - `cache`      TTL memoization layer with graceful degradation
/// - `risk`       EPA breakpoint tables and categorization
/// - `analysis`   latest-value reduction and spatial interpolation
/// - `ingest`     WAQI client and batch ingestion driver
/// - `service`    the query surface the API boundary calls

pub mod analysis;
pub mod cache;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod risk;
pub mod service;
pub mod stations;
pub mod store;

pub use config::Config;
pub use model::AqError;
pub use service::AirQualityService;
pub use stations::SEED_STATIONS;
