/// Seed station registry for the air quality monitoring service.
///
/// Defines the canonical list of WAQI stations the service bootstraps an
/// empty store with, along with their metadata. This is the single source of
/// truth for seed station ids - other modules should reference stations from
/// here rather than hardcoding ids. The live `params` list and `last_update`
/// for each station are maintained by ingestion in the persistent store, not
/// here.

use crate::model::Station;

// ---------------------------------------------------------------------------
// Station metadata
// ---------------------------------------------------------------------------

/// Metadata for a single seed station.
pub struct SeedStation {
    /// Stable slug used as the station_id in the store.
    pub station_id: &'static str,
    /// WAQI numeric station uid, used for `/feed/@{uid}` requests.
    pub uid: i64,
    /// Official station name as reported by the provider.
    pub name: &'static str,
    /// City the station belongs to.
    pub city: &'static str,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
}

/// Seed stations across the Indonesian archipelago, ordered west to east.
///
/// Sources:
///   - Station uids and coordinates: WAQI map search (aqicn.org)
pub static SEED_STATIONS: &[SeedStation] = &[
    SeedStation {
        station_id: "medan-us-consulate",
        uid: 9173,
        name: "Medan US Consulate",
        city: "Medan",
        latitude: 3.5710,
        longitude: 98.6740,
    },
    SeedStation {
        station_id: "pekanbaru",
        uid: 12723,
        name: "Pekanbaru",
        city: "Pekanbaru",
        latitude: 0.5071,
        longitude: 101.4478,
    },
    SeedStation {
        station_id: "palembang",
        uid: 12724,
        name: "Palembang",
        city: "Palembang",
        latitude: -2.9909,
        longitude: 104.7566,
    },
    SeedStation {
        station_id: "jakarta-us-embassy",
        uid: 1666,
        name: "Jakarta US Embassy",
        city: "Jakarta",
        latitude: -6.1820,
        longitude: 106.8283,
    },
    SeedStation {
        station_id: "jakarta-south",
        uid: 8687,
        name: "Jakarta South",
        city: "Jakarta",
        latitude: -6.2607,
        longitude: 106.8105,
    },
    SeedStation {
        station_id: "bandung",
        uid: 8688,
        name: "Bandung",
        city: "Bandung",
        latitude: -6.9147,
        longitude: 107.6098,
    },
    SeedStation {
        station_id: "semarang",
        uid: 12722,
        name: "Semarang",
        city: "Semarang",
        latitude: -6.9932,
        longitude: 110.4203,
    },
    SeedStation {
        station_id: "surabaya",
        uid: 8689,
        name: "Surabaya",
        city: "Surabaya",
        latitude: -7.2575,
        longitude: 112.7521,
    },
    SeedStation {
        station_id: "denpasar",
        uid: 12725,
        name: "Denpasar",
        city: "Denpasar",
        latitude: -8.6705,
        longitude: 115.2126,
    },
    SeedStation {
        station_id: "makassar",
        uid: 12726,
        name: "Makassar",
        city: "Makassar",
        latitude: -5.1477,
        longitude: 119.4327,
    },
];

impl SeedStation {
    /// Converts a seed entry into a bare `Station` record suitable for an
    /// idempotent insert. Ingestion fills in `params` and `last_update`.
    pub fn to_station(&self) -> Station {
        Station {
            station_id: self.station_id.to_string(),
            name: self.name.to_string(),
            city: self.city.to_string(),
            longitude: self.longitude,
            latitude: self.latitude,
            params: Vec::new(),
            last_update: None,
        }
    }
}

/// Returns the station ids of all seed stations.
pub fn all_station_ids() -> Vec<&'static str> {
    SEED_STATIONS.iter().map(|s| s.station_id).collect()
}

/// Looks up a seed station by id. Returns `None` if not found.
pub fn find_station(station_id: &str) -> Option<&'static SeedStation> {
    SEED_STATIONS.iter().find(|s| s.station_id == station_id)
}

/// Looks up a seed station by WAQI uid. Returns `None` if not found.
pub fn find_by_uid(uid: i64) -> Option<&'static SeedStation> {
    SEED_STATIONS.iter().find(|s| s.uid == uid)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
