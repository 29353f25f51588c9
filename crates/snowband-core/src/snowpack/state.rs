/// Snowpack state variables.
///
/// One [`SnowCell`] per `(hru, band, group)` cell, stored in the order of the
/// [`BandLayout`] arena.
use super::constants::{ALBEDO_FRESH, CELL_STATE_SIZE, RHO_WATER};
use crate::bands::BandLayout;
use crate::traits::ModelState;

/// State of the pack of one band and group.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnowCell {
    /// Snow water equivalent [m].
    pub stock: f64,
    /// Height [m].
    pub height: f64,
    /// Heat content relative to ice at 0 C [J/m2], never positive between steps.
    pub heat: f64,
    /// Retained liquid water [m].
    pub water: f64,
    /// Albedo [-].
    pub albedo: f64,
}

impl SnowCell {
    /// Relative bulk density (stock / height) [-], 0 without snow.
    pub fn density(&self) -> f64 {
        if self.stock > 0.0 && self.height > 0.0 {
            self.stock / self.height
        } else {
            0.0
        }
    }

    /// Bulk density [kg/m3].
    pub fn density_kg(&self) -> f64 {
        self.density() * RHO_WATER
    }

    /// Rescale every extensive quantity to a new stock.
    ///
    /// Without a previous stock there is nothing to scale: the pack restarts
    /// as fresh snow with zero heat and water.
    pub fn rescale(&mut self, new_stock: f64, new_height: f64) {
        let new_stock = new_stock.max(0.0);
        if self.stock > 0.0 {
            let ratio = new_stock / self.stock;
            self.heat *= ratio;
            self.water *= ratio;
        } else {
            self.heat = 0.0;
            self.water = 0.0;
            if new_stock > 0.0 {
                self.albedo = ALBEDO_FRESH;
            }
        }
        self.stock = new_stock;
        self.height = if new_stock > 0.0 { new_height } else { 0.0 };
    }

    pub fn to_array(&self) -> [f64; CELL_STATE_SIZE] {
        [self.stock, self.height, self.heat, self.water, self.albedo]
    }

    pub fn from_array(arr: [f64; CELL_STATE_SIZE]) -> Self {
        Self {
            stock: arr[0],
            height: arr[1],
            heat: arr[2],
            water: arr[3],
            albedo: arr[4],
        }
    }
}

/// Snowpack state of the whole basin.
#[derive(Debug, Clone, PartialEq)]
pub struct SnowState {
    pub cells: Vec<SnowCell>,
}

impl SnowState {
    /// Snow-free state for every cell of `layout`.
    pub fn initialize(layout: &BandLayout) -> Self {
        Self {
            cells: vec![SnowCell::default(); layout.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Serialize to a flat array. Layout: cells in arena order, each as
    /// [stock, height, heat, water, albedo].
    pub fn to_array(&self) -> Vec<f64> {
        let mut arr = Vec::with_capacity(self.cells.len() * CELL_STATE_SIZE);
        for c in &self.cells {
            arr.extend_from_slice(&c.to_array());
        }
        arr
    }
}

impl ModelState for SnowState {
    fn to_vec(&self) -> Vec<f64> {
        self.to_array()
    }

    fn from_slice(arr: &[f64]) -> Result<Self, String> {
        if arr.is_empty() {
            return Err("state array is empty".to_string());
        }
        if arr.len() % CELL_STATE_SIZE != 0 {
            return Err(format!(
                "state array length {} is not a multiple of cell state size {}",
                arr.len(),
                CELL_STATE_SIZE
            ));
        }
        let cells = arr
            .chunks_exact(CELL_STATE_SIZE)
            .map(|c| SnowCell::from_array([c[0], c[1], c[2], c[3], c[4]]))
            .collect();
        Ok(Self { cells })
    }

    fn array_len(&self) -> usize {
        self.cells.len() * CELL_STATE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(stock: f64, height: f64) -> SnowCell {
        SnowCell {
            stock,
            height,
            heat: -1000.0,
            water: 0.002,
            albedo: 0.6,
        }
    }

    #[test]
    fn initialize_is_snow_free() {
        let s = SnowState::initialize(&BandLayout::new(vec![2, 1]));
        assert_eq!(s.len(), 9);
        assert!(s.cells.iter().all(|c| *c == SnowCell::default()));
    }

    #[test]
    fn density_of_empty_cell_is_zero() {
        assert_eq!(SnowCell::default().density(), 0.0);
        assert!((cell(0.1, 0.4).density() - 0.25).abs() < 1e-12);
        assert!((cell(0.1, 0.4).density_kg() - 250.0).abs() < 1e-9);
    }

    #[test]
    fn rescale_follows_stock_ratio() {
        let mut c = cell(0.1, 0.4);
        c.rescale(0.2, 0.7);
        assert!((c.heat - -2000.0).abs() < 1e-9);
        assert!((c.water - 0.004).abs() < 1e-15);
        assert_eq!(c.height, 0.7);
        assert_eq!(c.albedo, 0.6);
    }

    #[test]
    fn rescale_from_bare_ground_refreshes_albedo() {
        let mut c = SnowCell {
            albedo: 0.15,
            ..Default::default()
        };
        c.rescale(0.05, 0.2);
        assert_eq!(c.heat, 0.0);
        assert_eq!(c.water, 0.0);
        assert_eq!(c.albedo, ALBEDO_FRESH);
    }

    #[test]
    fn rescale_to_zero_clears_height() {
        let mut c = cell(0.1, 0.4);
        c.rescale(-0.05, 0.3);
        assert_eq!(c.stock, 0.0);
        assert_eq!(c.height, 0.0);
        assert_eq!(c.heat, 0.0);
    }

    #[test]
    fn to_vec_from_slice_roundtrip() {
        let s = SnowState {
            cells: vec![cell(0.1, 0.4), SnowCell::default(), cell(0.3, 0.9)],
        };
        let arr = s.to_vec();
        assert_eq!(arr.len(), s.array_len());
        assert_eq!(SnowState::from_slice(&arr).unwrap(), s);
    }

    #[test]
    fn from_slice_rejects_bad_length() {
        assert!(SnowState::from_slice(&[]).is_err());
        assert!(SnowState::from_slice(&[0.0; 7]).is_err());
    }
}
