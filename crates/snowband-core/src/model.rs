/// Elevation-band snow model orchestration.
///
/// - `SnowBandModel::step()`: advance every band of every HRU by one step
/// - `SnowBandModel::run()`: step through a whole forcing series
///
/// A step distributes the HRU forcing to each band and group, runs the
/// energy balance, blends the observations of the date, applies the active
/// corrections and aggregates the HRU fluxes.
use std::path::Path;

use chrono::NaiveDateTime;

use crate::assimilation::{Assimilator, StationNetwork};
use crate::bands::BandGeometry;
use crate::basin::{Hru, LandCover};
use crate::context::RunContext;
use crate::corrections::{self, Correction};
use crate::elevation;
use crate::error::{SnowError, SnowResult};
use crate::forcing::{ForcingSeries, HruForcing};
use crate::outputs::{self, BandMeteo, HruFluxes, RunOutputs};
use crate::persistence;
use crate::radiation::{self, RadiationState, SlopeGeometry};
use crate::snowpack::{self, processes, CellForcing, HruParameters, SnowParameters, SnowState};
use crate::traits::GradientProvider;

/// Results of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// Fluxes of every HRU slot.
    pub hrus: Vec<HruFluxes>,
    /// Band meteorology, during the first simulated year only.
    pub band_meteo: Option<Vec<BandMeteo>>,
    /// Cell corrections made by assimilation.
    pub assimilated: usize,
    /// Cells changed by corrections.
    pub corrected: usize,
}

pub struct SnowBandModel {
    ctx: RunContext,
    geometry: BandGeometry,
    params: SnowParameters,
    hru_params: Vec<HruParameters>,
    slopes: Vec<SlopeGeometry>,
    elevations: Vec<f64>,
    gradients: Box<dyn GradientProvider>,
    assimilator: Option<Assimilator>,
    corrections: Vec<Correction>,
    state: SnowState,
    radiation: Vec<RadiationState>,
    record_band_swe: bool,
}

impl SnowBandModel {
    /// `hrus` and `hru_params` are given in the slot order of `ctx`.
    pub fn new(
        ctx: RunContext,
        geometry: BandGeometry,
        params: SnowParameters,
        hru_params: Vec<HruParameters>,
        hrus: &[Hru],
        gradients: Box<dyn GradientProvider>,
    ) -> SnowResult<Self> {
        params.validate()?;
        let n = ctx.n_hrus();
        if geometry.layout().n_hrus() != n || hru_params.len() != n || hrus.len() != n {
            return Err(SnowError::config(
                "model",
                format!(
                    "{} simulated HRUs but {} band lists, {} parameter rows and {} HRUs",
                    n,
                    geometry.layout().n_hrus(),
                    hru_params.len(),
                    hrus.len()
                ),
            ));
        }
        if let Some((h, id)) = hrus.iter().zip(ctx.hru_ids()).find(|(h, id)| h.id != **id) {
            return Err(SnowError::config(
                "model",
                format!("HRU {} found in the slot of HRU {}", h.id, id),
            ));
        }

        let state = SnowState::initialize(geometry.layout());
        log::info!(
            "{} HRUs split into {} bands, {} to {} every {} h",
            n,
            geometry.layout().total_bands(),
            ctx.start(),
            ctx.end(),
            ctx.time_step().hours()
        );
        Ok(Self {
            slopes: hrus.iter().map(SlopeGeometry::for_hru).collect(),
            elevations: hrus.iter().map(|h| h.elevation).collect(),
            radiation: vec![RadiationState::default(); n],
            ctx,
            geometry,
            params,
            hru_params,
            gradients,
            assimilator: None,
            corrections: Vec::new(),
            state,
            record_band_swe: false,
        })
    }

    /// Blend the observations of `network` into the state.
    pub fn with_assimilation(mut self, network: StationNetwork) -> SnowResult<Self> {
        self.assimilator = Some(Assimilator::new(
            network,
            self.geometry.layout(),
            self.params.assimilation_max_delay,
            self.ctx.time_step(),
        )?);
        Ok(self)
    }

    pub fn with_corrections(mut self, corrections: Vec<Correction>) -> Self {
        self.corrections = corrections;
        self
    }

    /// Start from `state` instead of a bare basin.
    pub fn with_state(mut self, state: SnowState) -> SnowResult<Self> {
        if state.len() != self.geometry.layout().len() {
            return Err(SnowError::state(
                "initial state",
                format!(
                    "{} cells given, layout has {}",
                    state.len(),
                    self.geometry.layout().len()
                ),
            ));
        }
        self.state = state;
        Ok(self)
    }

    /// Record the water equivalent of every band at every step.
    pub fn record_band_swe(mut self, record: bool) -> Self {
        self.record_band_swe = record;
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn geometry(&self) -> &BandGeometry {
        &self.geometry
    }

    pub fn params(&self) -> &SnowParameters {
        &self.params
    }

    pub fn state(&self) -> &SnowState {
        &self.state
    }

    pub fn assimilator(&self) -> Option<&Assimilator> {
        self.assimilator.as_ref()
    }

    /// Radiation of HRU slot `hru` at the last step.
    pub fn radiation(&self, hru: usize) -> &RadiationState {
        &self.radiation[hru]
    }

    /// Execute one step starting at `date`, one forcing record per HRU slot.
    pub fn step(&mut self, date: NaiveDateTime, forcing: &[HruForcing]) -> SnowResult<StepOutput> {
        let n = self.ctx.n_hrus();
        if forcing.len() != n {
            return Err(SnowError::Forcing(format!(
                "{}: {} forcing records for {} HRUs",
                date,
                forcing.len(),
                n
            )));
        }
        for f in forcing {
            f.validate()?;
        }

        let time_step = self.ctx.time_step();
        let layout = self.geometry.layout();
        let mut hrus = vec![HruFluxes::default(); n];
        let mut band_meteo = self
            .ctx
            .in_first_year(date)
            .then(|| Vec::with_capacity(layout.total_bands()));

        for (hru, f) in forcing.iter().enumerate() {
            self.radiation[hru] = radiation::compute(&self.slopes[hru], date, time_step);
            let radiation_index = self.radiation[hru].index;
            let gradients = self.gradients.gradients(hru, date);
            let hru_elev = self.elevations[hru];
            let acc = &mut hrus[hru];

            for band in 0..layout.n_bands(hru) {
                if let Some(meteo) = band_meteo.as_mut() {
                    let z = self.geometry.band_elevation(hru, band);
                    let bf = elevation::distribute(f, hru_elev, z, &gradients, time_step);
                    meteo.push(BandMeteo {
                        temperature: bf.tmean,
                        rain: bf.rain,
                        snow: bf.snow,
                    });
                }

                for cover in LandCover::ALL {
                    let i = layout.index(hru, band, cover);
                    let cell = self.geometry.cells()[i];
                    let bf = elevation::distribute(
                        f,
                        hru_elev,
                        cell.mean_elevation,
                        &gradients,
                        time_step,
                    );
                    let cf = CellForcing {
                        temp: bf.tmean,
                        rain: bf.rain,
                        snow_depth: processes::fresh_snow_depth(bf.snow, bf.tmean),
                        snow_density: processes::fresh_snow_density(bf.tmean),
                        fraction: cell.fraction,
                        radiation_index,
                    };
                    let class = self.hru_params[hru].class(cover);
                    let (next, fx) =
                        snowpack::step(&self.state.cells[i], &cf, class, &self.params, time_step);
                    self.state.cells[i] = next;

                    acc.rain += fx.rain * cell.fraction;
                    acc.snow += fx.snow * cell.fraction;
                    acc.melt += fx.melt * cell.fraction;
                    acc.runoff += fx.runoff;
                }
            }
            acc.radiation_index = radiation_index;
        }

        let assimilated = match self.assimilator.as_mut() {
            Some(a) => a.assimilate(date, layout, &mut self.state, self.params.max_density),
            None => 0,
        };
        let corrected = corrections::apply(
            &self.corrections,
            date,
            self.ctx.hru_ids(),
            layout,
            &mut self.state,
        );

        // Pack summaries after assimilation and corrections.
        for (hru, acc) in hrus.iter_mut().enumerate() {
            for i in layout.hru_cells(hru) {
                let fraction = self.geometry.cells()[i].fraction;
                let cell = &self.state.cells[i];
                acc.swe += cell.stock * fraction;
                acc.height += cell.height * fraction;
                acc.albedo += cell.albedo * fraction;
            }
        }

        log::trace!(
            "{}: {} assimilated, {} corrected",
            date,
            assimilated,
            corrected
        );
        Ok(StepOutput {
            hrus,
            band_meteo,
            assimilated,
            corrected,
        })
    }

    /// Step through `forcing`, one record per step of the run context.
    pub fn run(&mut self, forcing: &ForcingSeries) -> SnowResult<RunOutputs> {
        let n_steps = self.ctx.n_steps();
        if forcing.len() != n_steps {
            return Err(SnowError::Forcing(format!(
                "{} forcing steps for a run of {} steps",
                forcing.len(),
                n_steps
            )));
        }

        let mut out = RunOutputs::with_capacity(self.ctx.n_hrus(), n_steps, self.record_band_swe);
        let mut assimilated = 0;
        let mut corrected = 0;
        for (t, step_forcing) in forcing.iter().enumerate() {
            let date = self.ctx.date_of(t);
            let step = self.step(date, step_forcing)?;

            out.dates.push(date);
            for (ts, fluxes) in out.hrus.iter_mut().zip(&step.hrus) {
                ts.push(fluxes);
            }
            if let Some(band_swe) = out.band_swe.as_mut() {
                let stocks: Vec<f64> = self.state.cells.iter().map(|c| c.stock).collect();
                let fractions: Vec<f64> =
                    self.geometry.cells().iter().map(|b| b.fraction).collect();
                band_swe.push(outputs::band_swe(self.geometry.layout(), &fractions, &stocks));
            }
            if let Some(meteo) = step.band_meteo {
                out.band_meteo.push(meteo);
            }
            assimilated += step.assimilated;
            corrected += step.corrected;
        }

        log::info!(
            "{} steps done: {} assimilation and {} correction updates",
            n_steps,
            assimilated,
            corrected
        );
        Ok(out)
    }

    /// Write the current state, stamped with `date`.
    pub fn save_state(&self, path: &Path, label: &str, date: NaiveDateTime) -> SnowResult<()> {
        persistence::save(
            path,
            label,
            date,
            self.ctx.hru_ids(),
            self.geometry.layout(),
            &self.state,
        )
    }

    /// Replace the current state by the checkpoint at `path`. Returns its date.
    pub fn load_state(&mut self, path: &Path) -> SnowResult<NaiveDateTime> {
        let checkpoint = persistence::load(path, self.ctx.hru_ids(), self.geometry.layout())?;
        self.state = checkpoint.state;
        Ok(checkpoint.date)
    }
}
