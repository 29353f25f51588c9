/// Time step and meteorological forcing supplied by the interpolation layer.
///
/// Forcing arrives per simulated HRU, already interpolated; the vertical
/// distribution to bands happens in [`crate::elevation`].
use crate::error::{SnowError, SnowResult};

/// Simulation time step, in whole hours dividing a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeStep {
    hours: u32,
}

impl TimeStep {
    pub const HOURLY: TimeStep = TimeStep { hours: 1 };
    pub const DAILY: TimeStep = TimeStep { hours: 24 };

    /// Create a time step of `hours` hours. Must divide 24.
    pub fn from_hours(hours: u32) -> SnowResult<Self> {
        if hours == 0 || 24 % hours != 0 {
            return Err(SnowError::Forcing(format!(
                "time step of {} h does not divide a day",
                hours
            )));
        }
        Ok(Self { hours })
    }

    pub fn hours(self) -> u32 {
        self.hours
    }

    /// Fraction of a day covered by one step.
    pub fn days(self) -> f64 {
        self.hours as f64 / 24.0
    }

    pub fn seconds(self) -> f64 {
        self.hours as f64 * 3600.0
    }

    pub fn steps_per_day(self) -> u32 {
        24 / self.hours
    }

    pub fn is_hourly(self) -> bool {
        self.hours == 1
    }

    pub fn is_sub_daily(self) -> bool {
        self.hours < 24
    }
}

/// Precipitation as delivered by the interpolation collaborator [m water].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Precipitation {
    /// Total precipitation, partitioned into rain and snow by the model.
    Total(f64),
    /// Rain and snow already separated upstream.
    Split { rain: f64, snow: f64 },
}

impl Precipitation {
    pub fn total(&self) -> f64 {
        match *self {
            Precipitation::Total(p) => p,
            Precipitation::Split { rain, snow } => rain + snow,
        }
    }

    fn values(&self) -> [f64; 2] {
        match *self {
            Precipitation::Total(p) => [p, 0.0],
            Precipitation::Split { rain, snow } => [rain, snow],
        }
    }
}

/// Forcing of one HRU for one time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HruForcing {
    /// Minimum temperature [C].
    pub tmin: f64,
    /// Maximum temperature [C].
    pub tmax: f64,
    pub precipitation: Precipitation,
}

impl HruForcing {
    pub fn new(tmin: f64, tmax: f64, precip: f64) -> Self {
        Self {
            tmin,
            tmax,
            precipitation: Precipitation::Total(precip),
        }
    }

    pub fn split(tmin: f64, tmax: f64, rain: f64, snow: f64) -> Self {
        Self {
            tmin,
            tmax,
            precipitation: Precipitation::Split { rain, snow },
        }
    }

    /// Mean temperature [C].
    pub fn tmean(&self) -> f64 {
        0.5 * (self.tmin + self.tmax)
    }

    /// Validate a single record.
    pub fn validate(&self) -> SnowResult<()> {
        let precip = self.precipitation.values();
        if self.tmin.is_nan() || self.tmax.is_nan() || precip.iter().any(|v| v.is_nan()) {
            return Err(SnowError::Forcing("forcing contains NaN values".to_string()));
        }
        if self.tmin > self.tmax {
            return Err(SnowError::Forcing(format!(
                "tmin {} is above tmax {}",
                self.tmin, self.tmax
            )));
        }
        if precip.iter().any(|&v| v < 0.0) {
            return Err(SnowError::Forcing("negative precipitation".to_string()));
        }
        Ok(())
    }
}

/// Validated forcing for a whole run: one row per step, one record per
/// simulated HRU (in context order).
#[derive(Debug, Clone)]
pub struct ForcingSeries {
    steps: Vec<Vec<HruForcing>>,
}

impl ForcingSeries {
    pub fn new(steps: Vec<Vec<HruForcing>>, n_hrus: usize) -> SnowResult<Self> {
        if steps.is_empty() {
            return Err(SnowError::Forcing("forcing series is empty".to_string()));
        }
        for (t, row) in steps.iter().enumerate() {
            if row.len() != n_hrus {
                return Err(SnowError::Forcing(format!(
                    "step {} has {} records, expected {}",
                    t,
                    row.len(),
                    n_hrus
                )));
            }
            for f in row {
                f.validate()
                    .map_err(|e| SnowError::Forcing(format!("step {}: {}", t, e)))?;
            }
        }
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, t: usize) -> &[HruForcing] {
        &self.steps[t]
    }

    pub fn iter(&self) -> impl Iterator<Item = &[HruForcing]> {
        self.steps.iter().map(|r| r.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- TimeStep --

    #[test]
    fn time_step_fractions() {
        let daily = TimeStep::DAILY;
        assert_eq!(daily.days(), 1.0);
        assert_eq!(daily.steps_per_day(), 1);
        assert!(!daily.is_sub_daily());

        let three = TimeStep::from_hours(3).unwrap();
        assert_eq!(three.steps_per_day(), 8);
        assert!((three.days() - 0.125).abs() < 1e-12);
        assert_eq!(three.seconds(), 10800.0);
    }

    #[test]
    fn time_step_must_divide_day() {
        assert!(TimeStep::from_hours(5).is_err());
        assert!(TimeStep::from_hours(0).is_err());
        assert!(TimeStep::from_hours(6).is_ok());
    }

    #[test]
    fn time_step_ordering() {
        assert!(TimeStep::HOURLY < TimeStep::DAILY);
    }

    // -- HruForcing --

    #[test]
    fn forcing_rejects_inverted_temperatures() {
        let f = HruForcing::new(5.0, 1.0, 0.0);
        assert!(f.validate().is_err());
    }

    #[test]
    fn forcing_rejects_nan() {
        let f = HruForcing::split(-1.0, 1.0, f64::NAN, 0.0);
        assert!(f.validate().is_err());
    }

    #[test]
    fn split_total_adds_up() {
        let f = HruForcing::split(-1.0, 1.0, 0.002, 0.003);
        assert!((f.precipitation.total() - 0.005).abs() < 1e-15);
        assert_eq!(f.tmean(), 0.0);
    }

    // -- ForcingSeries --

    #[test]
    fn series_checks_row_length() {
        let rows = vec![vec![HruForcing::new(0.0, 1.0, 0.0)]];
        assert!(ForcingSeries::new(rows.clone(), 1).is_ok());
        assert!(ForcingSeries::new(rows, 2).is_err());
    }

    #[test]
    fn series_rejects_empty() {
        assert!(ForcingSeries::new(vec![], 1).is_err());
    }
}
