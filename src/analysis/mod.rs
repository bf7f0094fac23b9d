/// Analysis pipeline for the air quality service.
///
/// Pure computation over store snapshots - no I/O lives here. The aggregator
/// resolves latest-per-parameter values and risk classifications; the
/// interpolation submodules turn the same latest-value set into a continuous
/// spatial estimate grid.
///
/// Submodules:
/// - `latest` - latest-value grouping and station feature assembly.
/// - `triangulation` - Delaunay triangulation with barycentric queries.
/// - `interpolation` - padded-bbox regular grid estimation.

pub mod interpolation;
pub mod latest;
pub mod triangulation;
