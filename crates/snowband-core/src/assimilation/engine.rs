/// Data assimilation engine.
///
/// Blends the station observations of the current date into every band of
/// every HRU the station influences, one cycle tracker per cell and quantity.
use chrono::NaiveDateTime;

use super::stations::{SnowObservation, StationNetwork};
use super::tracker::Tracker;
use crate::bands::BandLayout;
use crate::basin::LandCover;
use crate::error::{SnowError, SnowResult};
use crate::forcing::TimeStep;
use crate::snowpack::constants::MIN_STOCK;
use crate::snowpack::SnowCell;
use crate::snowpack::SnowState;

/// Height over water equivalent of snow without a simulated reference [-].
pub const DEFAULT_HEIGHT_RATIO: f64 = 2.5;

/// Assimilation state of the run.
#[derive(Debug, Clone)]
pub struct Assimilator {
    network: StationNetwork,
    swe: Vec<Tracker>,
    height: Vec<Tracker>,
    max_steps: u32,
}

impl Assimilator {
    pub fn new(
        network: StationNetwork,
        layout: &BandLayout,
        max_delay_days: f64,
        time_step: TimeStep,
    ) -> SnowResult<Self> {
        for cover in LandCover::ALL {
            let group = network.group(cover);
            if !group.stations.is_empty() && group.weights.n_hrus() != layout.n_hrus() {
                return Err(SnowError::config(
                    "station weights",
                    format!(
                        "{} weights cover {} HRUs, {} are simulated",
                        cover.name(),
                        group.weights.n_hrus(),
                        layout.n_hrus()
                    ),
                ));
            }
        }
        let trackers: Vec<Tracker> = (0..layout.len())
            .map(|i| {
                let cover = LandCover::ALL[i % LandCover::COUNT];
                Tracker::new(network.group(cover).stations.len())
            })
            .collect();
        let max_steps = (max_delay_days * time_step.steps_per_day() as f64).round() as u32;
        log::info!(
            "assimilation of {} stations, cycles restarted after {} steps",
            network.n_stations(),
            max_steps
        );
        Ok(Self {
            network,
            swe: trackers.clone(),
            height: trackers,
            max_steps,
        })
    }

    pub fn network(&self) -> &StationNetwork {
        &self.network
    }

    /// Water-equivalent tracker of arena cell `index`.
    pub fn swe_tracker(&self, index: usize) -> &Tracker {
        &self.swe[index]
    }

    /// Height tracker of arena cell `index`.
    pub fn height_tracker(&self, index: usize) -> &Tracker {
        &self.height[index]
    }

    /// Blend the observations taken at `date` into `state`, then advance the
    /// cycle counters. Returns the number of cell corrections.
    pub fn assimilate(
        &mut self,
        date: NaiveDateTime,
        layout: &BandLayout,
        state: &mut SnowState,
        max_density: f64,
    ) -> usize {
        let mut corrections = 0;
        for cover in LandCover::ALL {
            let group = self.network.group(cover);
            for (k, station) in group.stations.iter().enumerate() {
                let Some(obs) = station.observation(date) else {
                    continue;
                };
                if obs.water_equivalent().is_none() && obs.positive_height().is_none() {
                    log::warn!("station {}: unusable observation on {}", station.name, date);
                    continue;
                }
                for hru in 0..layout.n_hrus() {
                    let weight = group.weights.get(hru, k);
                    if weight <= 0.0 {
                        continue;
                    }
                    for band in 0..layout.n_bands(hru) {
                        let i = layout.index(hru, band, cover);
                        correct_cell(
                            &mut state.cells[i],
                            &mut self.swe[i],
                            &mut self.height[i],
                            k,
                            obs,
                            weight,
                            self.max_steps,
                            max_density,
                        );
                        corrections += 1;
                    }
                }
            }
        }
        for t in self.swe.iter_mut().chain(self.height.iter_mut()) {
            t.tick();
        }
        if corrections > 0 {
            log::debug!("{}: {} cell corrections", date, corrections);
        }
        corrections
    }
}

/// Height over water equivalent left by the last blends of the cycles, or
/// [`DEFAULT_HEIGHT_RATIO`] while either reference is empty.
fn reference_ratio(swe: &Tracker, height: &Tracker) -> f64 {
    if swe.reference > 0.0 && height.reference > 0.0 {
        height.reference / swe.reference
    } else {
        DEFAULT_HEIGHT_RATIO
    }
}

#[allow(clippy::too_many_arguments)]
fn correct_cell(
    cell: &mut SnowCell,
    swe_tracker: &mut Tracker,
    height_tracker: &mut Tracker,
    station: usize,
    obs: &SnowObservation,
    weight: f64,
    max_steps: u32,
    max_density: f64,
) {
    let mut stock = cell.stock;
    let mut height = cell.height;
    let measured_swe = obs.water_equivalent();

    if measured_swe.is_some() && swe_tracker.needs_reset(station, max_steps) {
        swe_tracker.reset(stock);
    }
    if height_tracker.needs_reset(station, max_steps) {
        height_tracker.reset(height);
    }
    // Missing heights follow the references, taken before this blend.
    let measured_height = obs.positive_height().or_else(|| {
        measured_swe.map(|swe| swe * reference_ratio(swe_tracker, height_tracker))
    });

    if let Some(measured) = measured_swe {
        stock = swe_tracker.blend(station, measured, stock, weight);
    }
    if let Some(measured) = measured_height {
        height = height_tracker.blend(station, measured, height, weight);
    }

    if stock < MIN_STOCK {
        stock = 0.0;
    } else if height <= 0.0 || stock / height > max_density {
        height = stock / max_density;
    }
    cell.rescale(stock, height);
}
