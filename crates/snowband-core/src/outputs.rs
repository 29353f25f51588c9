/// Per-step results of a snow band run.
///
/// HRU fluxes are area-weighted over bands and groups; band series are kept
/// per `(hru, band)` in [`BandLayout::band_index`] order.
use chrono::NaiveDateTime;
use snowband_macros::Fluxes;

use crate::bands::BandLayout;
use crate::basin::LandCover;

/// Fluxes and pack summary of one HRU for one step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Fluxes)]
pub struct HruFluxes {
    /// Rainfall [m].
    pub rain: f64,
    /// Snowfall [m water equivalent].
    pub snow: f64,
    /// Melt released by the packs [m].
    pub melt: f64,
    /// Water reaching the HRU: released melt plus rain on bare ground [m].
    pub runoff: f64,
    /// Snow water equivalent [m].
    pub swe: f64,
    /// Snow height [m].
    pub height: f64,
    pub albedo: f64,
    pub radiation_index: f64,
}

/// Mean meteorology of one band for one step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandMeteo {
    pub temperature: f64,
    /// Rainfall [m].
    pub rain: f64,
    /// Snowfall [m water equivalent].
    pub snow: f64,
}

/// Everything recorded over a run.
#[derive(Debug, Clone)]
pub struct RunOutputs {
    /// Step start dates.
    pub dates: Vec<NaiveDateTime>,
    /// One timeseries per HRU slot.
    pub hrus: Vec<HruFluxesTimeseries>,
    /// Band water equivalent per step, when recorded.
    pub band_swe: Option<Vec<Vec<f64>>>,
    /// Band meteorology of the steps of the first simulated year.
    pub band_meteo: Vec<Vec<BandMeteo>>,
}

impl RunOutputs {
    pub fn with_capacity(n_hrus: usize, n_steps: usize, band_swe: bool) -> Self {
        Self {
            dates: Vec::with_capacity(n_steps),
            hrus: (0..n_hrus)
                .map(|_| HruFluxesTimeseries::with_capacity(n_steps))
                .collect(),
            band_swe: band_swe.then(|| Vec::with_capacity(n_steps)),
            band_meteo: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Basin totals of one column, area-weighted with `areas` (one per HRU slot).
    pub fn basin_series(&self, column: &str, areas: &[f64]) -> Option<Vec<f64>> {
        let total: f64 = areas.iter().sum();
        let mut out = vec![0.0; self.len()];
        for (ts, &a) in self.hrus.iter().zip(areas) {
            for (o, v) in out.iter_mut().zip(ts.column(column)?) {
                *o += v * a / total;
            }
        }
        Some(out)
    }
}

/// Water equivalent of every band, weighted by group area.
pub fn band_swe(layout: &BandLayout, fractions: &[f64], stocks: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(layout.total_bands());
    for hru in 0..layout.n_hrus() {
        for band in 0..layout.n_bands(hru) {
            let mut weight = 0.0;
            let mut swe = 0.0;
            for cover in LandCover::ALL {
                let i = layout.index(hru, band, cover);
                weight += fractions[i];
                swe += fractions[i] * stocks[i];
            }
            out.push(if weight > 0.0 { swe / weight } else { 0.0 });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hru_fluxes_columns() {
        assert_eq!(
            HruFluxes::field_names(),
            &["rain", "snow", "melt", "runoff", "swe", "height", "albedo", "radiation_index"]
        );
        let mut ts = HruFluxesTimeseries::with_capacity(2);
        ts.push(&HruFluxes {
            swe: 0.1,
            ..Default::default()
        });
        assert_eq!(ts.column("swe"), Some(&[0.1][..]));
    }

    #[test]
    fn basin_series_weights_by_area() {
        let mut out = RunOutputs::with_capacity(2, 1, false);
        out.dates.push(NaiveDateTime::default());
        out.hrus[0].push(&HruFluxes {
            runoff: 1.0,
            ..Default::default()
        });
        out.hrus[1].push(&HruFluxes {
            runoff: 4.0,
            ..Default::default()
        });
        let s = out.basin_series("runoff", &[3.0, 1.0]).unwrap();
        assert!((s[0] - 1.75).abs() < 1e-12);
        assert!(out.basin_series("nope", &[3.0, 1.0]).is_none());
    }

    #[test]
    fn band_swe_ignores_empty_groups() {
        let layout = BandLayout::new(vec![2]);
        let fractions = [0.0, 0.25, 0.25, 0.0, 0.0, 0.0];
        let stocks = [9.0, 0.1, 0.3, 1.0, 1.0, 1.0];
        let swe = band_swe(&layout, &fractions, &stocks);
        assert!((swe[0] - 0.2).abs() < 1e-12);
        assert_eq!(swe[1], 0.0);
    }
}
