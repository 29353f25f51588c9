/// Band geometry builder.
///
/// Scans the HRU raster once per pass: the first pass records the elevation
/// range of every simulated HRU, the second bins pixels into
/// `floor((z - min) / band_height)` per land-cover group.
use super::{BandGeometry, ElevationBand, HruExtent};
use crate::basin::LandCover;
use crate::context::RunContext;
use crate::error::{SnowError, SnowResult};
use crate::raster::{self, Raster};

/// Number of bands for an elevation range.
///
/// Equals `ceil(range / band_height)` with a floor of one band, plus a
/// padding band when the range is an exact multiple, so the highest pixel
/// always lands in a band of its own rather than past the last interval.
pub fn band_count(min_elevation: f64, max_elevation: f64, band_height: f64) -> usize {
    ((max_elevation - min_elevation) / band_height).floor() as usize + 1
}

#[derive(Debug, Clone)]
pub struct BandGeometryBuilder {
    band_height: f64,
    conifer: Vec<i64>,
    deciduous: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: usize,
    elevation_sum: f64,
}

impl BandGeometryBuilder {
    /// `conifer` and `deciduous` list the land-cover raster values of each
    /// group; every other value is open terrain.
    pub fn new(band_height: f64, conifer: Vec<i64>, deciduous: Vec<i64>) -> SnowResult<Self> {
        if band_height.is_nan() || band_height <= 0.0 {
            return Err(SnowError::config(
                "band geometry",
                format!("band height must be positive, got {}", band_height),
            ));
        }
        if let Some(v) = conifer.iter().find(|v| deciduous.contains(v)) {
            return Err(SnowError::config(
                "band geometry",
                format!("land-cover index {} is both conifer and deciduous", v),
            ));
        }
        Ok(Self {
            band_height,
            conifer,
            deciduous,
        })
    }

    pub fn classify(&self, value: Option<f64>) -> LandCover {
        match value {
            Some(v) => {
                let code = v.round() as i64;
                if self.conifer.contains(&code) {
                    LandCover::Conifer
                } else if self.deciduous.contains(&code) {
                    LandCover::Deciduous
                } else {
                    LandCover::Open
                }
            }
            None => LandCover::Open,
        }
    }

    pub fn build(
        &self,
        ctx: &RunContext,
        hrus: &Raster,
        dem: &Raster,
        land_cover: &Raster,
    ) -> SnowResult<BandGeometry> {
        raster::check_alignment(hrus, dem, land_cover)?;

        let n = ctx.n_hrus();
        let mut min_z = vec![f64::INFINITY; n];
        let mut max_z = vec![f64::NEG_INFINITY; n];

        // Pass 1: elevation range per simulated HRU.
        for row in 0..hrus.rows {
            for col in 0..hrus.cols {
                if let Some((slot, z)) = self.pixel(ctx, hrus, dem, row, col) {
                    min_z[slot] = min_z[slot].min(z);
                    max_z[slot] = max_z[slot].max(z);
                }
            }
        }

        if let Some(slot) = min_z.iter().position(|z| z.is_infinite()) {
            return Err(SnowError::Raster(format!(
                "simulated HRU {} has no valid pixel in the rasters",
                ctx.hru_ids()[slot]
            )));
        }

        // Pass 2: bin pixels per band and group.
        let mut bins: Vec<Vec<[Accumulator; 3]>> = (0..n)
            .map(|s| {
                let count = band_count(min_z[s], max_z[s], self.band_height);
                vec![[Accumulator::default(); 3]; count]
            })
            .collect();

        for row in 0..hrus.rows {
            for col in 0..hrus.cols {
                if let Some((slot, z)) = self.pixel(ctx, hrus, dem, row, col) {
                    let band = ((z - min_z[slot]) / self.band_height).floor() as usize;
                    let cover = self.classify(land_cover.value(row, col));
                    let acc = &mut bins[slot][band][cover.index()];
                    acc.count += 1;
                    acc.elevation_sum += z;
                }
            }
        }

        let pixel_area = hrus.pixel_area();
        let mut per_hru = Vec::with_capacity(n);
        let mut extents = Vec::with_capacity(n);
        let mut total_bands = 0;

        for (slot, hru_bins) in bins.into_iter().enumerate() {
            let pixels: usize = hru_bins
                .iter()
                .flat_map(|b| b.iter())
                .map(|a| a.count)
                .sum();
            let hru_area = pixels as f64 * pixel_area;

            let bands: Vec<[ElevationBand; 3]> = hru_bins
                .iter()
                .enumerate()
                .map(|(i, accs)| {
                    let mid = min_z[slot] + (i as f64 + 0.5) * self.band_height;
                    accs.map(|a| {
                        let area = a.count as f64 * pixel_area;
                        ElevationBand {
                            area,
                            fraction: area / hru_area,
                            mean_elevation: if a.count > 0 {
                                a.elevation_sum / a.count as f64
                            } else {
                                mid
                            },
                        }
                    })
                })
                .collect();

            log::debug!(
                "HRU {}: {} bands between {:.1} m and {:.1} m, {:.0} m2",
                ctx.hru_ids()[slot],
                bands.len(),
                min_z[slot],
                max_z[slot],
                hru_area
            );
            total_bands += bands.len();

            extents.push(HruExtent {
                min_elevation: min_z[slot],
                max_elevation: max_z[slot],
                area: hru_area,
            });
            per_hru.push(bands);
        }

        log::info!("built {} elevation bands for {} HRUs", total_bands, n);
        BandGeometry::from_parts(self.band_height, per_hru, extents)
    }

    /// Simulated HRU slot and elevation of a pixel, when both are valid.
    #[inline]
    fn pixel(
        &self,
        ctx: &RunContext,
        hrus: &Raster,
        dem: &Raster,
        row: usize,
        col: usize,
    ) -> Option<(usize, f64)> {
        let id = hrus.value(row, col)?;
        if id < 0.0 {
            return None;
        }
        let slot = ctx.slot_of(id.round() as u32)?;
        let z = dem.value(row, col)?;
        Some((slot, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcing::TimeStep;
    use chrono::NaiveDate;

    fn ctx(ids: Vec<u32>) -> RunContext {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        RunContext::new(start, end, TimeStep::DAILY, ids).unwrap()
    }

    fn grid(rows: usize, cols: usize, data: Vec<f64>) -> Raster {
        Raster::new(250000.0, 5100000.0, 10.0, rows, cols, -9999.0, data).unwrap()
    }

    // -- band_count --

    #[test]
    fn flat_hru_has_one_band() {
        assert_eq!(band_count(500.0, 500.0, 100.0), 1);
    }

    #[test]
    fn exact_multiple_gets_padding_band() {
        assert_eq!(band_count(500.0, 800.0, 100.0), 4);
    }

    #[test]
    fn partial_range_rounds_up() {
        assert_eq!(band_count(500.0, 750.0, 100.0), 3);
        assert_eq!(band_count(500.0, 550.0, 100.0), 1);
    }

    // -- classify --

    #[test]
    fn classification_uses_index_lists() {
        let b = BandGeometryBuilder::new(100.0, vec![1, 2], vec![5]).unwrap();
        assert_eq!(b.classify(Some(2.0)), LandCover::Conifer);
        assert_eq!(b.classify(Some(5.0)), LandCover::Deciduous);
        assert_eq!(b.classify(Some(9.0)), LandCover::Open);
        assert_eq!(b.classify(None), LandCover::Open);
    }

    #[test]
    fn overlapping_groups_rejected() {
        assert!(BandGeometryBuilder::new(100.0, vec![1, 2], vec![2]).is_err());
        assert!(BandGeometryBuilder::new(0.0, vec![], vec![]).is_err());
    }

    // -- build --

    #[test]
    fn builds_bands_and_fractions() {
        // HRU 1 covers the first two columns, HRU 2 the last one.
        let hrus = grid(2, 3, vec![1.0, 1.0, 2.0, 1.0, 1.0, 2.0]);
        let dem = grid(2, 3, vec![500.0, 560.0, 900.0, 620.0, 700.0, 900.0]);
        let lc = grid(2, 3, vec![1.0, 3.0, 3.0, 3.0, 1.0, 1.0]);
        let builder = BandGeometryBuilder::new(100.0, vec![1], vec![]).unwrap();
        let g = builder.build(&ctx(vec![1, 2]), &hrus, &dem, &lc).unwrap();

        // HRU 1: range 500..700 -> 3 bands (exact multiple, padding).
        assert_eq!(g.n_bands(0), 3);
        assert_eq!(g.n_bands(1), 1);

        let b0c = g.band(0, 0, LandCover::Conifer);
        assert!((b0c.area - 100.0).abs() < 1e-9);
        assert!((b0c.fraction - 0.25).abs() < 1e-12);
        assert_eq!(b0c.mean_elevation, 500.0);

        let b0o = g.band(0, 0, LandCover::Open);
        assert_eq!(b0o.mean_elevation, 560.0);
        let b1o = g.band(0, 1, LandCover::Open);
        assert_eq!(b1o.mean_elevation, 620.0);
        let b2c = g.band(0, 2, LandCover::Conifer);
        assert_eq!(b2c.mean_elevation, 700.0);

        // Empty cells keep the band mid-elevation.
        assert_eq!(g.band(0, 1, LandCover::Deciduous).mean_elevation, 650.0);

        for slot in 0..2 {
            assert!((g.fraction_sum(slot) - 1.0).abs() < 1e-12);
        }
        assert!((g.extent(0).area - 400.0).abs() < 1e-9);
        assert!((g.extent(1).area - 200.0).abs() < 1e-9);
    }

    #[test]
    fn band_areas_reconstruct_group_area() {
        let hrus = grid(3, 3, vec![4.0; 9]);
        let dem = grid(3, 3, vec![100.0, 130.0, 180.0, 210.0, 260.0, 290.0, 300.0, 350.0, 410.0]);
        let lc = grid(3, 3, vec![7.0, 8.0, 9.0, 7.0, 8.0, 9.0, 7.0, 8.0, 9.0]);
        let builder = BandGeometryBuilder::new(50.0, vec![7], vec![8]).unwrap();
        let g = builder.build(&ctx(vec![4]), &hrus, &dem, &lc).unwrap();

        for lc in LandCover::ALL {
            let area: f64 = (0..g.n_bands(0)).map(|b| g.band(0, b, lc).area).sum();
            assert!((area - 300.0).abs() < 1e-9, "{:?}", lc);
        }
        assert_eq!(g.n_bands(0), band_count(100.0, 410.0, 50.0));
    }

    #[test]
    fn skips_unsimulated_and_nodata_pixels() {
        let hrus = grid(1, 4, vec![1.0, 3.0, -9999.0, 1.0]);
        let dem = grid(1, 4, vec![100.0, 100.0, 100.0, -9999.0]);
        let lc = grid(1, 4, vec![1.0; 4]);
        let builder = BandGeometryBuilder::new(100.0, vec![], vec![]).unwrap();
        let g = builder.build(&ctx(vec![1]), &hrus, &dem, &lc).unwrap();
        assert!((g.extent(0).area - 100.0).abs() < 1e-9);
    }

    #[test]
    fn missing_hru_is_an_error() {
        let hrus = grid(1, 2, vec![1.0, 1.0]);
        let dem = grid(1, 2, vec![100.0, 110.0]);
        let builder = BandGeometryBuilder::new(100.0, vec![], vec![]).unwrap();
        assert!(builder.build(&ctx(vec![1, 2]), &hrus, &dem, &dem.clone()).is_err());
    }

    #[test]
    fn misaligned_rasters_are_rejected() {
        let hrus = grid(1, 2, vec![1.0, 1.0]);
        let dem = Raster::new(250010.0, 5100000.0, 10.0, 1, 2, -9999.0, vec![1.0, 1.0]).unwrap();
        let builder = BandGeometryBuilder::new(100.0, vec![], vec![]).unwrap();
        assert!(matches!(
            builder.build(&ctx(vec![1]), &hrus, &dem, &hrus.clone()),
            Err(SnowError::Raster(_))
        ));
    }
}
