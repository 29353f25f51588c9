//! Elevation bands per HRU and land-cover group.
//!
//! Bands are built once from rasters by [`builder::BandGeometryBuilder`] and
//! never recomputed. [`BandLayout`] maps `(hru, band, group)` to a linear
//! index shared by every per-band vector of the model.

pub mod builder;

use std::ops::Range;

use crate::basin::LandCover;
use crate::error::{SnowError, SnowResult};

pub use builder::BandGeometryBuilder;

/// One elevation band of one land-cover group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationBand {
    /// Area [m2].
    pub area: f64,
    /// Fraction of the whole HRU area [-].
    pub fraction: f64,
    /// Mean elevation of the band pixels [m].
    pub mean_elevation: f64,
}

/// Elevation extent of one HRU as seen by the rasters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HruExtent {
    pub min_elevation: f64,
    pub max_elevation: f64,
    /// Rasterized area [m2].
    pub area: f64,
}

/// Flat index over `(hru slot, band, group)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandLayout {
    offsets: Vec<usize>,
    counts: Vec<usize>,
    total_bands: usize,
}

impl BandLayout {
    /// Build from the number of bands of every HRU slot.
    pub fn new(counts: Vec<usize>) -> Self {
        let mut offsets = Vec::with_capacity(counts.len());
        let mut acc = 0;
        for &n in &counts {
            offsets.push(acc);
            acc += n;
        }
        Self {
            offsets,
            counts,
            total_bands: acc,
        }
    }

    pub fn n_hrus(&self) -> usize {
        self.counts.len()
    }

    pub fn n_bands(&self, hru: usize) -> usize {
        self.counts[hru]
    }

    /// Bands over all HRUs.
    pub fn total_bands(&self) -> usize {
        self.total_bands
    }

    /// Number of `(hru, band, group)` cells.
    pub fn len(&self) -> usize {
        self.total_bands * LandCover::COUNT
    }

    pub fn is_empty(&self) -> bool {
        self.total_bands == 0
    }

    #[inline]
    pub fn index(&self, hru: usize, band: usize, cover: LandCover) -> usize {
        debug_assert!(band < self.counts[hru], "band {band} out of range for HRU slot {hru}");
        (self.offsets[hru] + band) * LandCover::COUNT + cover.index()
    }

    /// Linear band index (all groups together) of `(hru, band)`.
    #[inline]
    pub fn band_index(&self, hru: usize, band: usize) -> usize {
        self.offsets[hru] + band
    }

    /// Cell range of one HRU.
    pub fn hru_cells(&self, hru: usize) -> Range<usize> {
        let start = self.offsets[hru] * LandCover::COUNT;
        start..start + self.counts[hru] * LandCover::COUNT
    }
}

/// Immutable band geometry of the simulated basin.
#[derive(Debug, Clone)]
pub struct BandGeometry {
    band_height: f64,
    layout: BandLayout,
    bands: Vec<ElevationBand>,
    extents: Vec<HruExtent>,
}

impl BandGeometry {
    /// Assemble from per-HRU band lists, each band holding one entry per
    /// group in [`LandCover::ALL`] order.
    pub fn from_parts(
        band_height: f64,
        per_hru: Vec<Vec<[ElevationBand; 3]>>,
        extents: Vec<HruExtent>,
    ) -> SnowResult<Self> {
        if per_hru.len() != extents.len() {
            return Err(SnowError::config(
                "band geometry",
                format!("{} band lists for {} HRU extents", per_hru.len(), extents.len()),
            ));
        }
        if let Some(slot) = per_hru.iter().position(|b| b.is_empty()) {
            return Err(SnowError::config(
                "band geometry",
                format!("HRU slot {} has no elevation band", slot),
            ));
        }
        let layout = BandLayout::new(per_hru.iter().map(|b| b.len()).collect());
        let mut bands = Vec::with_capacity(layout.len());
        for hru_bands in per_hru {
            for band in hru_bands {
                bands.extend_from_slice(&band);
            }
        }
        Ok(Self {
            band_height,
            layout,
            bands,
            extents,
        })
    }

    /// One band per HRU at the HRU elevation, split between groups by the
    /// HRU's `fractions` (conifer, deciduous, open).
    pub fn single_band(
        elevations: &[f64],
        areas: &[f64],
        fractions: &[[f64; 3]],
    ) -> SnowResult<Self> {
        let n = elevations.len();
        if areas.len() != n || fractions.len() != n {
            return Err(SnowError::config(
                "single band geometry",
                format!(
                    "{} elevations, {} areas and {} fraction rows",
                    n,
                    areas.len(),
                    fractions.len()
                ),
            ));
        }
        let per_hru = elevations
            .iter()
            .zip(areas)
            .zip(fractions)
            .map(|((&z, &a), row)| {
                vec![row.map(|f| ElevationBand {
                    area: a * f,
                    fraction: f,
                    mean_elevation: z,
                })]
            })
            .collect();
        let extents = elevations
            .iter()
            .zip(areas)
            .map(|(&z, &a)| HruExtent {
                min_elevation: z,
                max_elevation: z,
                area: a,
            })
            .collect();
        Self::from_parts(f64::INFINITY, per_hru, extents)
    }

    pub fn band_height(&self) -> f64 {
        self.band_height
    }

    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    pub fn n_bands(&self, hru: usize) -> usize {
        self.layout.n_bands(hru)
    }

    pub fn extent(&self, hru: usize) -> &HruExtent {
        &self.extents[hru]
    }

    #[inline]
    pub fn band(&self, hru: usize, band: usize, cover: LandCover) -> &ElevationBand {
        &self.bands[self.layout.index(hru, band, cover)]
    }

    /// Band cells in arena order.
    pub fn cells(&self) -> &[ElevationBand] {
        &self.bands
    }

    /// Area-weighted mean elevation of band `band` over all groups. Falls back
    /// to the plain mean when the band carries no area.
    pub fn band_elevation(&self, hru: usize, band: usize) -> f64 {
        let mut area = 0.0;
        let mut weighted = 0.0;
        for lc in LandCover::ALL {
            let b = self.band(hru, band, lc);
            area += b.area;
            weighted += b.area * b.mean_elevation;
        }
        if area > 0.0 {
            weighted / area
        } else {
            LandCover::ALL
                .iter()
                .map(|&lc| self.band(hru, band, lc).mean_elevation)
                .sum::<f64>()
                / LandCover::COUNT as f64
        }
    }

    /// Sum of band fractions of one HRU.
    pub fn fraction_sum(&self, hru: usize) -> f64 {
        self.bands[self.layout.hru_cells(hru)]
            .iter()
            .map(|b| b.fraction)
            .sum()
    }
}
