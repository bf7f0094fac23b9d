/// Spatial interpolation of scattered station readings onto a regular grid.
///
/// Turns the latest per-station values for one pollutant into a continuous
/// heatmap estimate: pad the sample bounding box, lay a regular
/// `resolution × resolution` grid over it, triangulate the samples once, and
/// linearly interpolate each grid cell center inside the triangulation.
/// Cells outside the convex hull of the samples stay empty - extrapolated
/// pollution estimates are not trustworthy and are never fabricated.

use serde::{Deserialize, Serialize};

use crate::analysis::triangulation::{Point, Triangulation};
use crate::model::{AqError, BoundingBox, Sample};

/// Minimum number of samples a piecewise-linear surface needs.
pub const MIN_SAMPLES: usize = 3;

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// A regular estimate grid over the padded sample bounding box.
///
/// Cells are row-major: rows ordered by increasing latitude, columns by
/// increasing longitude, matching the inclusive-endpoint axis generation.
/// `None` cells had no coverage; external serialization omits them.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationGrid {
    pub bbox: BoundingBox,
    pub width: usize,
    pub height: usize,
    lons: Vec<f64>,
    lats: Vec<f64>,
    cells: Vec<Option<f64>>,
}

/// One non-empty grid cell in the external (lat, lon, value) form the
/// dashboard heat layer consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

impl InterpolationGrid {
    /// The estimate at (row, col), or `None` when the cell center fell
    /// outside the sample convex hull.
    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(row * self.width + col).copied().flatten()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn estimated_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Flattens the grid to its external representation, omitting cells
    /// without a value rather than emitting a placeholder.
    pub fn points(&self) -> Vec<HeatmapPoint> {
        let mut out = Vec::with_capacity(self.estimated_count());
        for (row, &lat) in self.lats.iter().enumerate() {
            for (col, &lon) in self.lons.iter().enumerate() {
                if let Some(value) = self.cells[row * self.width + col] {
                    out.push(HeatmapPoint { lat, lon, value });
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Interpolation
// ---------------------------------------------------------------------------

/// Estimates a `resolution × resolution` grid from scattered samples.
///
/// Requires at least [`MIN_SAMPLES`] samples (a surface is undefined for
/// fewer points) and a resolution of at least 2 per axis. Exact duplicate
/// coordinates are collapsed to their first occurrence before triangulating,
/// since coincident points carry no additional surface information.
pub fn interpolate(
    samples: &[Sample],
    resolution: usize,
    padding_degrees: f64,
) -> Result<InterpolationGrid, AqError> {
    if samples.len() < MIN_SAMPLES {
        return Err(AqError::InsufficientData { have: samples.len(), need: MIN_SAMPLES });
    }
    if resolution < 2 {
        return Err(AqError::InvalidResolution(resolution));
    }

    let deduped = dedupe_coordinates(samples);
    if deduped.len() < MIN_SAMPLES {
        return Err(AqError::InsufficientData { have: deduped.len(), need: MIN_SAMPLES });
    }

    let mut lon_min = f64::INFINITY;
    let mut lat_min = f64::INFINITY;
    let mut lon_max = f64::NEG_INFINITY;
    let mut lat_max = f64::NEG_INFINITY;
    for s in &deduped {
        lon_min = lon_min.min(s.longitude);
        lat_min = lat_min.min(s.latitude);
        lon_max = lon_max.max(s.longitude);
        lat_max = lat_max.max(s.latitude);
    }

    let bbox = BoundingBox {
        lon_min: lon_min - padding_degrees,
        lat_min: lat_min - padding_degrees,
        lon_max: lon_max + padding_degrees,
        lat_max: lat_max + padding_degrees,
    };

    let lons = linspace(bbox.lon_min, bbox.lon_max, resolution);
    let lats = linspace(bbox.lat_min, bbox.lat_max, resolution);

    let points: Vec<Point> = deduped
        .iter()
        .map(|s| Point::new(s.longitude, s.latitude))
        .collect();
    let values: Vec<f64> = deduped.iter().map(|s| s.value).collect();

    // Triangulate once, query once per cell.
    let triangulation = Triangulation::build(&points);

    let mut cells = Vec::with_capacity(resolution * resolution);
    for &lat in &lats {
        for &lon in &lons {
            cells.push(triangulation.interpolate(&values, lon, lat));
        }
    }

    Ok(InterpolationGrid {
        bbox,
        width: resolution,
        height: resolution,
        lons,
        lats,
        cells,
    })
}

/// Inclusive-endpoint axis generation: `count` evenly spaced values from
/// `start` to `end`.
fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    let step = (end - start) / (count - 1) as f64;
    (0..count).map(|i| start + step * i as f64).collect()
}

fn dedupe_coordinates(samples: &[Sample]) -> Vec<Sample> {
    let mut out: Vec<Sample> = Vec::with_capacity(samples.len());
    for s in samples {
        let seen = out
            .iter()
            .any(|e| e.longitude == s.longitude && e.latitude == s.latitude);
        if !seen {
            out.push(s.clone());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, lon: f64, lat: f64, value: f64) -> Sample {
        Sample {
            station_id: id.to_string(),
            longitude: lon,
            latitude: lat,
            value,
        }
    }

    /// Three non-collinear stations around Jakarta.
    fn jakarta_samples() -> Vec<Sample> {
        vec![
            sample("a", 106.8, -6.2, 10.0),
            sample("b", 107.0, -6.0, 40.0),
            sample("c", 106.5, -6.4, 80.0),
        ]
    }

    #[test]
    fn test_fewer_than_three_samples_is_a_hard_error() {
        let two = vec![sample("a", 106.8, -6.2, 10.0), sample("b", 107.0, -6.0, 40.0)];
        match interpolate(&two, 5, 0.1) {
            Err(AqError::InsufficientData { have, need }) => {
                assert_eq!(have, 2);
                assert_eq!(need, 3);
            }
            other => panic!("expected InsufficientData, got {:?}", other.map(|g| g.cell_count())),
        }
    }

    #[test]
    fn test_three_noncollinear_samples_produce_estimates() {
        let grid = interpolate(&jakarta_samples(), 5, 0.1).expect("3 samples suffice");
        assert_eq!(grid.cell_count(), 25);
        assert!(
            grid.estimated_count() >= 1,
            "at least one cell center must fall inside the sample hull"
        );
    }

    #[test]
    fn test_grid_has_resolution_squared_cells() {
        let grid = interpolate(&jakarta_samples(), 12, 0.5).expect("interpolate");
        assert_eq!(grid.width, 12);
        assert_eq!(grid.height, 12);
        assert_eq!(grid.cell_count(), 144);
    }

    #[test]
    fn test_bbox_is_padded_on_every_side() {
        let grid = interpolate(&jakarta_samples(), 5, 0.5).expect("interpolate");
        assert!((grid.bbox.lon_min - 106.0).abs() < 1e-9);
        assert!((grid.bbox.lon_max - 107.5).abs() < 1e-9);
        assert!((grid.bbox.lat_min - (-6.9)).abs() < 1e-9);
        assert!((grid.bbox.lat_max - (-5.5)).abs() < 1e-9);
    }

    #[test]
    fn test_corner_cells_outside_hull_are_absent() {
        // With padding, the grid corners lie well outside the triangle of
        // samples; they must be absent, never a fabricated number.
        let grid = interpolate(&jakarta_samples(), 5, 0.5).expect("interpolate");
        assert_eq!(grid.cell(0, 0), None);
        assert_eq!(grid.cell(0, 4), None);
        assert_eq!(grid.cell(4, 0), None);
        assert_eq!(grid.cell(4, 4), None);
    }

    #[test]
    fn test_estimates_stay_within_sample_value_range() {
        // Linear interpolation inside the hull can never overshoot the
        // sampled extremes.
        let grid = interpolate(&jakarta_samples(), 20, 0.2).expect("interpolate");
        for row in 0..20 {
            for col in 0..20 {
                if let Some(v) = grid.cell(row, col) {
                    assert!(
                        (10.0 - 1e-6..=80.0 + 1e-6).contains(&v),
                        "estimate {} outside sampled range at ({}, {})",
                        v,
                        row,
                        col
                    );
                }
            }
        }
    }

    #[test]
    fn test_points_are_emitted_in_row_major_lat_then_lon_order() {
        let grid = interpolate(&jakarta_samples(), 8, 0.3).expect("interpolate");
        let points = grid.points();
        assert_eq!(points.len(), grid.estimated_count());
        for pair in points.windows(2) {
            let row_order = pair[0].lat < pair[1].lat
                || (pair[0].lat == pair[1].lat && pair[0].lon < pair[1].lon);
            assert!(row_order, "points must walk rows by ascending latitude");
        }
    }

    #[test]
    fn test_collinear_samples_yield_an_empty_surface() {
        // Three stations on one line pass the count precondition but admit
        // no triangles, so every cell is absent.
        let collinear = vec![
            sample("a", 106.0, -6.0, 10.0),
            sample("b", 106.5, -6.0, 20.0),
            sample("c", 107.0, -6.0, 30.0),
        ];
        let grid = interpolate(&collinear, 5, 0.1).expect("count precondition holds");
        assert_eq!(grid.estimated_count(), 0);
    }

    #[test]
    fn test_duplicate_coordinates_collapse_before_the_count_check() {
        let duplicated = vec![
            sample("a", 106.8, -6.2, 10.0),
            sample("a2", 106.8, -6.2, 99.0),
            sample("b", 107.0, -6.0, 40.0),
        ];
        match interpolate(&duplicated, 5, 0.1) {
            Err(AqError::InsufficientData { have, .. }) => assert_eq!(have, 2),
            other => panic!("expected InsufficientData, got {:?}", other.map(|g| g.cell_count())),
        }
    }

    #[test]
    fn test_resolution_below_two_is_rejected() {
        assert_eq!(
            interpolate(&jakarta_samples(), 1, 0.1).err(),
            Some(AqError::InvalidResolution(1))
        );
    }

    #[test]
    fn test_interior_cells_interpolate_between_sample_values() {
        // A denser grid over the Jakarta triangle: some interior estimate
        // must land strictly between the extreme sample values.
        let grid = interpolate(&jakarta_samples(), 30, 0.05).expect("interpolate");
        let interior = grid
            .points()
            .into_iter()
            .any(|p| p.value > 15.0 && p.value < 75.0);
        assert!(interior, "expected interior estimates strictly between 10 and 80");
    }
}
