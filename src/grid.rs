//! Geometry helpers for map plots: plot extents, grid line spacing and turning
//! lists of gridded points back into 2D arrays.
use itertools::Itertools;
use log::warn;

use crate::{frame::Extent, stats::min_max};

/// Grids with more cells than this are not rasterized, whatever the number of points.
const MAX_GRID_CELLS: usize = 10_000_000;

/// A grid may have at most this many cells per point with data; sparser
/// point sets are not treated as gridded.
const MAX_CELLS_PER_POINT: usize = 100;

/// Two coordinates closer than this (in degrees) are the same grid line.
const COORD_TOLERANCE: f64 = 1e-6;

/// Values on a regular lat/lon grid. `z[j][i]` is the value at `lat[j]`, `lon[i]`,
/// `None` where there is no data.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2D {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub z: Vec<Vec<Option<f64>>>,
}

/// The grid spacing of `coords`: the smallest difference between two distinct values.
/// Returns `None` if there are fewer than two distinct values.
pub fn infer_step(coords: &[f64]) -> Option<f64> {
    coords.iter()
        .copied()
        .filter(|c| c.is_finite())
        .sorted_by(|a, b| a.total_cmp(b))
        .dedup_by(|a, b| (a - b).abs() < COORD_TOLERANCE)
        .tuple_windows()
        .map(|(a, b)| b - a)
        .min_by(|a, b| a.total_cmp(b))
}

/// The region to show on a map of points at `lat`/`lon`.
///
/// For `gridded` data the bounding box is widened by half a grid step so that the
/// outermost cells are shown completely. The box is then padded on each side by `pad`
/// times its height (at least one degree) and clipped to the globe.
pub fn plot_extent(lat: &[f64], lon: &[f64], gridded: bool, pad: f64) -> Option<Extent> {
    let (mut lat_min, mut lat_max) = min_max(lat)?;
    let (mut lon_min, mut lon_max) = min_max(lon)?;

    if gridded {
        let half_lat = infer_step(lat).unwrap_or(0.0) / 2.0;
        let half_lon = infer_step(lon).unwrap_or(0.0) / 2.0;
        lat_min -= half_lat;
        lat_max += half_lat;
        lon_min -= half_lon;
        lon_max += half_lon;
    }

    let padding = pad * (lat_max - lat_min).max(1.0);
    Some(Extent {
        lon_min: (lon_min - padding).max(-180.0),
        lon_max: (lon_max + padding).min(180.0),
        lat_min: (lat_min - padding).max(-90.0),
        lat_max: (lat_max + padding).min(90.0),
    })
}

/// Choose from `intervals` the grid line spacing that gives closest to five lines
/// across the smaller dimension of `extent`.
pub fn grid_interval(extent: &Extent, intervals: &[f64]) -> f64 {
    let span = extent.width().min(extent.height());
    intervals.iter()
        .copied()
        .filter(|&i| i > 0.0)
        .min_by(|a, b| {
            let da = (span / a - 5.0).abs();
            let db = (span / b - 5.0).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(span / 5.0)
}

/// Arrange `values` located at `lat`/`lon` on a regular grid.
///
/// The grid spacing is inferred separately for each axis with [`infer_step`]. Returns
/// `None` if there are no points or the grid would be unreasonably large, which
/// means the points are not actually on a regular grid.
pub fn to_grid(lat: &[f64], lon: &[f64], values: &[f64]) -> Option<Grid2D> {
    let (lat0, lat1) = min_max(lat)?;
    let (lon0, lon1) = min_max(lon)?;
    let lat_step = infer_step(lat).unwrap_or(1.0);
    let lon_step = infer_step(lon).unwrap_or(1.0);

    let ny = ((lat1 - lat0) / lat_step).round() as usize + 1;
    let nx = ((lon1 - lon0) / lon_step).round() as usize + 1;
    let ncells = nx.saturating_mul(ny);
    let npoints = lat.iter().zip(lon.iter()).zip(values.iter())
        .filter(|((y, x), v)| y.is_finite() && x.is_finite() && v.is_finite())
        .count();
    if ncells > MAX_GRID_CELLS || ncells > npoints.saturating_mul(MAX_CELLS_PER_POINT) {
        warn!("{npoints} points would make a {ny} x {nx} grid, which is too large or sparse to rasterize");
        return None;
    }

    let mut z = vec![vec![None; nx]; ny];
    for ((&y, &x), &v) in lat.iter().zip(lon.iter()).zip(values.iter()) {
        if !(x.is_finite() && y.is_finite() && v.is_finite()) {
            continue;
        }
        let j = ((y - lat0) / lat_step).round() as usize;
        let i = ((x - lon0) / lon_step).round() as usize;
        z[j][i] = Some(v);
    }

    Some(Grid2D {
        lon: (0..nx).map(|i| lon0 + i as f64 * lon_step).collect(),
        lat: (0..ny).map(|j| lat0 + j as f64 * lat_step).collect(),
        z,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_infer_step() {
        assert_eq!(infer_step(&[0.5, 1.5, 0.5, 3.5]), Some(1.0));
        assert_eq!(infer_step(&[2.0, 2.0]), None);
        assert_eq!(infer_step(&[]), None);
    }

    #[test]
    fn test_plot_extent_scattered() {
        let e = plot_extent(&[10.0, 20.0], &[0.0, 30.0], false, 0.1).unwrap();
        assert_abs_diff_eq!(e.lat_min, 9.0);
        assert_abs_diff_eq!(e.lat_max, 21.0);
        assert_abs_diff_eq!(e.lon_min, -1.0);
        assert_abs_diff_eq!(e.lon_max, 31.0);
    }

    #[test]
    fn test_plot_extent_gridded_and_clipped() {
        let e = plot_extent(&[-89.0, 89.0], &[-179.0, -177.0, 179.0], true, 0.15).unwrap();
        assert_abs_diff_eq!(e.lat_min, -90.0);
        assert_abs_diff_eq!(e.lat_max, 90.0);
        assert_abs_diff_eq!(e.lon_min, -180.0);
        assert_abs_diff_eq!(e.lon_max, 180.0);
        assert!(plot_extent(&[], &[], true, 0.15).is_none());
    }

    #[test]
    fn test_grid_interval() {
        let intervals = [0.5, 1.0, 2.0, 5.0, 10.0, 30.0];
        let e = Extent { lon_min: -10.0, lon_max: 40.0, lat_min: 30.0, lat_max: 55.0 };
        assert_eq!(grid_interval(&e, &intervals), 5.0);
        let e = Extent { lon_min: -180.0, lon_max: 180.0, lat_min: -90.0, lat_max: 90.0 };
        assert_eq!(grid_interval(&e, &intervals), 30.0);
        let e = Extent { lon_min: 0.0, lon_max: 2.0, lat_min: 0.0, lat_max: 3.0 };
        assert_eq!(grid_interval(&e, &intervals), 0.5);
        assert_eq!(grid_interval(&e, &[]), 0.4);
    }

    #[test]
    fn test_to_grid() {
        let lat = [10.0, 10.0, 11.0, 13.0, 13.0];
        let lon = [0.0, 1.0, 1.0, 1.0, 0.0];
        let values = [1.0, 2.0, 3.0, 4.0, f64::NAN];
        let grid = to_grid(&lat, &lon, &values).unwrap();
        assert_eq!(grid.lat, vec![10.0, 11.0, 12.0, 13.0]);
        assert_eq!(grid.lon, vec![0.0, 1.0]);
        assert_eq!(grid.z, vec![
            vec![Some(1.0), Some(2.0)],
            vec![None, Some(3.0)],
            vec![None, None],
            vec![None, Some(4.0)],
        ]);
    }

    #[test]
    fn test_to_grid_irregular() {
        let lat = [0.0, 1e-5, 80.0];
        let lon = [0.0, 1e-5, 170.0];
        assert!(to_grid(&lat, &lon, &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_to_grid_cells_per_point() {
        // 3 points on a 61 x 61 grid of 0.5 degree cells
        let lat = [0.0, 0.5, 30.0];
        let lon = [0.0, 0.5, 30.0];
        assert!(to_grid(&lat, &lon, &[1.0, 2.0, 3.0]).is_none());

        // 3 points on a 11 x 11 grid is sparse, but within the limit
        let lat = [0.0, 0.5, 5.0];
        let lon = [0.0, 0.5, 5.0];
        let grid = to_grid(&lat, &lon, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(grid.lat.len(), 11);
        assert_eq!(grid.z[10][10], Some(3.0));

        // Points without a value do not count
        let values = [1.0, f64::NAN, f64::NAN];
        assert!(to_grid(&lat, &lon, &values).is_none());
    }
}
