/// Health-risk categorization.
///
/// Maps a scalar reading (a raw PM2.5 concentration or a composite AQI
/// index) to a discrete risk tier with an associated display color and
/// advisory text. The mapping is a step function over a breakpoint table;
/// two standard tables are provided and the caller chooses based on which
/// scale the value is on.
///
/// Boundary semantics: upper bounds are inclusive, so a value exactly at a
/// breakpoint belongs to the lower tier (12.0 µg/m³ is still Good).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Risk tiers
// ---------------------------------------------------------------------------

/// US EPA risk tiers, in ascending order of severity. The derived `Ord`
/// makes monotonicity checks direct comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl RiskCategory {
    /// Display label matching the original dashboard wording.
    pub fn label(&self) -> &'static str {
        match self {
            RiskCategory::Good => "Good",
            RiskCategory::Moderate => "Moderate",
            RiskCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            RiskCategory::Unhealthy => "Unhealthy",
            RiskCategory::VeryUnhealthy => "Very Unhealthy",
            RiskCategory::Hazardous => "Hazardous",
        }
    }
}

// ---------------------------------------------------------------------------
// Breakpoint tables
// ---------------------------------------------------------------------------

/// One row of a breakpoint table: the tier that applies to all values up to
/// and including `upper`. The final row uses `f64::INFINITY` as its bound so
/// every finite value maps to some tier.
#[derive(Debug, Clone, Copy)]
pub struct Breakpoint {
    pub upper: f64,
    pub category: RiskCategory,
    pub color: &'static str,
    pub advisory: &'static str,
}

/// An ordered breakpoint table. Entries must be sorted ascending by `upper`
/// and end with an unbounded catch-all row.
#[derive(Debug, Clone, Copy)]
pub struct BreakpointTable {
    entries: &'static [Breakpoint],
}

impl BreakpointTable {
    pub fn entries(&self) -> &'static [Breakpoint] {
        self.entries
    }
}

/// US EPA PM2.5 breakpoints in µg/m³, with the color palette and advisories
/// the dashboard displays.
static PM25_BREAKPOINTS: &[Breakpoint] = &[
    Breakpoint {
        upper: 12.0,
        category: RiskCategory::Good,
        color: "#00e400",
        advisory: "Air quality is satisfactory, and air pollution poses little or no risk.",
    },
    Breakpoint {
        upper: 35.4,
        category: RiskCategory::Moderate,
        color: "#ffff00",
        advisory: "Air quality is acceptable. However, there may be a risk for some people, \
                   particularly those who are unusually sensitive to air pollution.",
    },
    Breakpoint {
        upper: 55.4,
        category: RiskCategory::UnhealthyForSensitiveGroups,
        color: "#ff7e00",
        advisory: "Members of sensitive groups (children, elderly, people with heart/lung \
                   disease) may experience health effects. The general public is less \
                   likely to be affected.",
    },
    Breakpoint {
        upper: 150.4,
        category: RiskCategory::Unhealthy,
        color: "#ff0000",
        advisory: "Some members of the general public may experience health effects; members \
                   of sensitive groups may experience more serious health effects.",
    },
    Breakpoint {
        upper: 250.4,
        category: RiskCategory::VeryUnhealthy,
        color: "#8f3f97",
        advisory: "Health alert: The risk of health effects is increased for everyone.",
    },
    Breakpoint {
        upper: f64::INFINITY,
        category: RiskCategory::Hazardous,
        color: "#7e0023",
        advisory: "Health warning of emergency conditions: everyone is more likely to be \
                   affected.",
    },
];

/// Simplified AQI-index breakpoints for dashboard display. The index scale
/// keeps the standard 50/100/150/200/300 cut points but merges the two
/// unhealthy tiers and the two severe tiers into one each, so consecutive
/// rows intentionally repeat a category.
static AQI_INDEX_BREAKPOINTS: &[Breakpoint] = &[
    Breakpoint {
        upper: 50.0,
        category: RiskCategory::Good,
        color: "#00e400",
        advisory: "Air quality is satisfactory, and air pollution poses little or no risk.",
    },
    Breakpoint {
        upper: 100.0,
        category: RiskCategory::Moderate,
        color: "#ffff00",
        advisory: "Air quality is acceptable. However, there may be a risk for some people, \
                   particularly those who are unusually sensitive to air pollution.",
    },
    Breakpoint {
        upper: 150.0,
        category: RiskCategory::Unhealthy,
        color: "#ff0000",
        advisory: "Some members of the general public may experience health effects; members \
                   of sensitive groups may experience more serious health effects.",
    },
    Breakpoint {
        upper: 200.0,
        category: RiskCategory::Unhealthy,
        color: "#ff0000",
        advisory: "Some members of the general public may experience health effects; members \
                   of sensitive groups may experience more serious health effects.",
    },
    Breakpoint {
        upper: 300.0,
        category: RiskCategory::Hazardous,
        color: "#7e0023",
        advisory: "Health warning of emergency conditions: everyone is more likely to be \
                   affected.",
    },
    Breakpoint {
        upper: f64::INFINITY,
        category: RiskCategory::Hazardous,
        color: "#7e0023",
        advisory: "Health warning of emergency conditions: everyone is more likely to be \
                   affected.",
    },
];

/// The 6-tier PM2.5 table, for raw concentrations in µg/m³.
pub fn pm25_table() -> BreakpointTable {
    BreakpointTable { entries: PM25_BREAKPOINTS }
}

/// The simplified AQI-index table, for composite index values.
pub fn aqi_index_table() -> BreakpointTable {
    BreakpointTable { entries: AQI_INDEX_BREAKPOINTS }
}

// ---------------------------------------------------------------------------
// Categorization
// ---------------------------------------------------------------------------

/// The outcome of categorizing one reading, in the shape the dashboard and
/// API boundary consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub category: RiskCategory,
    pub level: String,
    pub color: String,
    pub advisory: String,
}

/// Maps `value` to the first breakpoint whose inclusive upper bound covers
/// it. Callers must not pass a missing-value sentinel; absence is handled
/// upstream with `Option` (see `analysis::latest::risk_for`).
pub fn categorize(value: f64, table: BreakpointTable) -> RiskAssessment {
    // The last entry has an infinite bound, so the scan always terminates
    // with a match; the NaN case falls through to the catch-all row.
    let entries = table.entries();
    let mut bp = &entries[entries.len() - 1];
    for candidate in entries {
        if value <= candidate.upper {
            bp = candidate;
            break;
        }
    }

    RiskAssessment {
        category: bp.category,
        level: bp.category.label().to_string(),
        color: bp.color.to_string(),
        advisory: bp.advisory.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pm25_boundary_values_belong_to_lower_tier() {
        // Inclusive upper bound: exactly 12.0 is still Good.
        assert_eq!(categorize(12.0, pm25_table()).category, RiskCategory::Good);
        assert_eq!(categorize(12.01, pm25_table()).category, RiskCategory::Moderate);
        assert_eq!(categorize(35.4, pm25_table()).category, RiskCategory::Moderate);
        assert_eq!(
            categorize(35.5, pm25_table()).category,
            RiskCategory::UnhealthyForSensitiveGroups
        );
    }

    #[test]
    fn test_pm25_colors_match_epa_palette() {
        assert_eq!(categorize(5.0, pm25_table()).color, "#00e400");
        assert_eq!(categorize(150.0, pm25_table()).color, "#ff0000");
        assert_eq!(categorize(200.0, pm25_table()).color, "#8f3f97");
        assert_eq!(categorize(300.0, pm25_table()).color, "#7e0023");
    }

    #[test]
    fn test_pm25_values_beyond_all_finite_bounds_are_hazardous() {
        assert_eq!(categorize(250.5, pm25_table()).category, RiskCategory::Hazardous);
        assert_eq!(categorize(1000.0, pm25_table()).category, RiskCategory::Hazardous);
    }

    #[test]
    fn test_pm25_tier_is_monotonic_non_decreasing() {
        // Step through the whole scale in 0.1 µg/m³ increments; the tier
        // must never get less severe as the concentration rises.
        let mut prev = RiskCategory::Good;
        let mut v = 0.0;
        while v < 400.0 {
            let tier = categorize(v, pm25_table()).category;
            assert!(
                tier >= prev,
                "tier regressed from {:?} to {:?} at value {}",
                prev,
                tier,
                v
            );
            prev = tier;
            v += 0.1;
        }
    }

    #[test]
    fn test_aqi_index_table_merges_unhealthy_and_severe_tiers() {
        // The simplified index scale collapses to four distinct tiers.
        assert_eq!(categorize(40.0, aqi_index_table()).category, RiskCategory::Good);
        assert_eq!(categorize(75.0, aqi_index_table()).category, RiskCategory::Moderate);
        assert_eq!(categorize(120.0, aqi_index_table()).category, RiskCategory::Unhealthy);
        assert_eq!(categorize(180.0, aqi_index_table()).category, RiskCategory::Unhealthy);
        assert_eq!(categorize(250.0, aqi_index_table()).category, RiskCategory::Hazardous);
        assert_eq!(categorize(400.0, aqi_index_table()).category, RiskCategory::Hazardous);
    }

    #[test]
    fn test_tables_are_sorted_ascending_and_end_unbounded() {
        for table in [pm25_table(), aqi_index_table()] {
            let entries = table.entries();
            for pair in entries.windows(2) {
                assert!(
                    pair[0].upper <= pair[1].upper,
                    "breakpoints must be sorted ascending"
                );
            }
            assert!(entries.last().unwrap().upper.is_infinite());
        }
    }

    #[test]
    fn test_level_string_matches_category_label() {
        let a = categorize(45.0, pm25_table());
        assert_eq!(a.level, "Unhealthy for Sensitive Groups");
        assert_eq!(a.category, RiskCategory::UnhealthyForSensitiveGroups);
    }
}
