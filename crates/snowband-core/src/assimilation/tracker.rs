/// Per-cell bookkeeping of an assimilation cycle.
use smallvec::{smallvec, SmallVec};

use super::blend::{blend, Blended};

/// Station flags kept inline for the usual handful of stations per group.
pub type StationFlags = SmallVec<[bool; 8]>;

/// Assimilation cycle of one quantity in one `(hru, band, group)` cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracker {
    /// Steps since the last reset.
    pub steps: u32,
    /// Weight spent in the cycle [-].
    pub cumulative_weight: f64,
    /// Share of `reference` attributed to the simulation [-].
    pub sim_fraction: f64,
    /// Value left by the last blend, or the value at reset.
    pub reference: f64,
    /// Stations of the group already blended in the cycle.
    pub used: StationFlags,
}

impl Tracker {
    pub fn new(n_stations: usize) -> Self {
        Self {
            steps: 0,
            cumulative_weight: 0.0,
            sim_fraction: 1.0,
            reference: 0.0,
            used: smallvec![false; n_stations],
        }
    }

    /// Whether blending `station` now must start a new cycle. A cycle without
    /// any blend yet restarts from the current value.
    pub fn needs_reset(&self, station: usize, max_steps: u32) -> bool {
        !self.used.iter().any(|&u| u)
            || self.used.get(station).copied().unwrap_or(false)
            || self.cumulative_weight >= 1.0
            || self.steps >= max_steps
    }

    /// Start a new cycle from `current`.
    pub fn reset(&mut self, current: f64) {
        self.steps = 0;
        self.cumulative_weight = 0.0;
        self.sim_fraction = 1.0;
        self.reference = current;
        self.used.iter_mut().for_each(|f| *f = false);
    }

    /// Blend the observation of `station` into `current` and record it.
    pub fn blend(&mut self, station: usize, measured: f64, current: f64, weight: f64) -> f64 {
        let Blended {
            value,
            sim_fraction,
        } = blend(
            measured,
            current,
            self.reference,
            self.cumulative_weight,
            weight,
            self.sim_fraction,
        );
        self.cumulative_weight += weight;
        self.sim_fraction = sim_fraction;
        self.reference = value;
        if let Some(flag) = self.used.get_mut(station) {
            *flag = true;
        }
        value
    }

    /// Advance the step counter.
    pub fn tick(&mut self) {
        self.steps = self.steps.saturating_add(1);
    }
}
