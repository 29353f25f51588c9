//! In-memory raster grids.
//!
//! File formats are handled upstream; the band builder only needs
//! co-registered grids with an origin, a cell size and a no-data sentinel.

use crate::error::{SnowError, SnowResult};

/// Row-major grid anchored at its top-left corner.
#[derive(Debug, Clone)]
pub struct Raster {
    /// Top-left x coordinate.
    pub origin_x: f64,
    /// Top-left y coordinate.
    pub origin_y: f64,
    /// Cell size [m].
    pub cell_size: f64,
    pub rows: usize,
    pub cols: usize,
    pub nodata: f64,
    data: Vec<f64>,
}

impl Raster {
    pub fn new(
        origin_x: f64,
        origin_y: f64,
        cell_size: f64,
        rows: usize,
        cols: usize,
        nodata: f64,
        data: Vec<f64>,
    ) -> SnowResult<Self> {
        if data.len() != rows * cols {
            return Err(SnowError::Raster(format!(
                "raster has {} values, expected {} x {} = {}",
                data.len(),
                rows,
                cols,
                rows * cols
            )));
        }
        if cell_size.is_nan() || cell_size <= 0.0 {
            return Err(SnowError::Raster(format!("invalid cell size {}", cell_size)));
        }
        Ok(Self {
            origin_x,
            origin_y,
            cell_size,
            rows,
            cols,
            nodata,
            data,
        })
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Value at (row, col), `None` when outside the grid or no-data.
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.get(row, col).filter(|&v| !self.is_nodata(v))
    }

    #[inline]
    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || (self.nodata.is_finite() && (value - self.nodata).abs() < 1e-10)
    }

    /// Area of one pixel [m2].
    pub fn pixel_area(&self) -> f64 {
        self.cell_size * self.cell_size
    }

    /// Origins equal once truncated to 7 decimal digits.
    pub fn same_origin(&self, other: &Raster) -> bool {
        truncate7(self.origin_x) == truncate7(other.origin_x)
            && truncate7(self.origin_y) == truncate7(other.origin_y)
    }

    pub fn same_resolution(&self, other: &Raster) -> bool {
        truncate7(self.cell_size) == truncate7(other.cell_size)
    }

    /// True when this grid covers at least the extent of `other`.
    pub fn covers(&self, other: &Raster) -> bool {
        self.rows >= other.rows && self.cols >= other.cols
    }
}

fn truncate7(v: f64) -> i64 {
    (v * 1e7).trunc() as i64
}

/// Check that DEM and land-cover are co-registered with the HRU grid.
pub fn check_alignment(hrus: &Raster, dem: &Raster, land_cover: &Raster) -> SnowResult<()> {
    for (name, r) in [("elevation", dem), ("land cover", land_cover)] {
        if !r.same_origin(hrus) {
            return Err(SnowError::Raster(format!(
                "{} raster origin ({}, {}) differs from HRU raster origin ({}, {})",
                name, r.origin_x, r.origin_y, hrus.origin_x, hrus.origin_y
            )));
        }
        if !r.same_resolution(hrus) {
            return Err(SnowError::Raster(format!(
                "{} raster cell size {} differs from HRU raster cell size {}",
                name, r.cell_size, hrus.cell_size
            )));
        }
        if !r.covers(hrus) {
            return Err(SnowError::Raster(format!(
                "{} raster ({} x {}) is smaller than the HRU raster ({} x {})",
                name, r.rows, r.cols, hrus.rows, hrus.cols
            )));
        }
    }
    Ok(())
}
