/// Snowpack parameters.
///
/// Global pack parameters plus the per-HRU melt parameters of each
/// land-cover group.
use super::constants::CLASS_PARAM_BOUNDS;
use crate::basin::LandCover;
use crate::error::{SnowError, SnowResult};

/// Melt parameters of one land-cover group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassParameters {
    /// Melt threshold temperature [C].
    pub melt_threshold: f64,
    /// Melt rate [m/C/day].
    pub melt_rate: f64,
}

impl ClassParameters {
    pub fn new(melt_threshold: f64, melt_rate: f64) -> SnowResult<Self> {
        for (name, value, (lo, hi)) in [
            ("melt threshold", melt_threshold, CLASS_PARAM_BOUNDS[0]),
            ("melt rate", melt_rate, CLASS_PARAM_BOUNDS[1]),
        ] {
            if !(lo..=hi).contains(&value) {
                return Err(SnowError::config(
                    "parameters",
                    format!("{} = {} is out of bounds [{}, {}]", name, value, lo, hi),
                ));
            }
        }
        Ok(Self {
            melt_threshold,
            melt_rate,
        })
    }
}

/// Melt parameters of one HRU, indexed by [`LandCover::index`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HruParameters {
    pub classes: [ClassParameters; 3],
}

impl HruParameters {
    pub fn uniform(class: ClassParameters) -> Self {
        Self {
            classes: [class; 3],
        }
    }

    #[inline]
    pub fn class(&self, cover: LandCover) -> &ClassParameters {
        &self.classes[cover.index()]
    }
}

/// Global snowpack parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SnowParameters {
    /// Maximum bulk density, as a fraction of water density [-].
    pub max_density: f64,
    /// Compaction rate [1/day].
    pub compaction: f64,
    /// Snow water equivalent that renews the albedo [m].
    pub albedo_threshold: f64,
    /// Albedo decay while the air is below the melt threshold [1/day].
    pub albedo_decay_solid: f64,
    /// Albedo decay while the air is above the melt threshold [1/day].
    pub albedo_decay_liquid: f64,
    /// Ground heat flux expressed as a melt rate [m/day].
    pub ground_melt: f64,
    /// Elevation band height [m].
    pub band_height: f64,
    /// Land-cover raster values of the conifer group.
    pub conifer_indices: Vec<i64>,
    /// Land-cover raster values of the deciduous group.
    pub deciduous_indices: Vec<i64>,
    /// Days after which an assimilation cycle is restarted [day].
    pub assimilation_max_delay: f64,
}

impl Default for SnowParameters {
    fn default() -> Self {
        Self {
            max_density: 0.45,
            compaction: 0.01,
            albedo_threshold: 0.01,
            albedo_decay_solid: 0.03,
            albedo_decay_liquid: 0.12,
            ground_melt: 0.0001,
            band_height: 100.0,
            conifer_indices: Vec::new(),
            deciduous_indices: Vec::new(),
            assimilation_max_delay: 10.0,
        }
    }
}

impl SnowParameters {
    pub fn validate(&self) -> SnowResult<()> {
        let checks = [
            ("max density", self.max_density, 0.05, 1.0),
            ("compaction", self.compaction, 0.0, 1.0),
            ("albedo threshold", self.albedo_threshold, 1e-6, 1.0),
            ("albedo decay solid", self.albedo_decay_solid, 0.0, 10.0),
            ("albedo decay liquid", self.albedo_decay_liquid, 0.0, 10.0),
            ("ground melt", self.ground_melt, 0.0, 0.01),
            ("band height", self.band_height, 1.0, 10_000.0),
            ("assimilation max delay", self.assimilation_max_delay, 0.0, 3650.0),
        ];
        for (name, value, lo, hi) in checks {
            if !(lo..=hi).contains(&value) {
                return Err(SnowError::config(
                    "parameters",
                    format!("{} = {} is out of bounds [{}, {}]", name, value, lo, hi),
                ));
            }
        }
        if let Some(v) = self
            .conifer_indices
            .iter()
            .find(|v| self.deciduous_indices.contains(v))
        {
            return Err(SnowError::config(
                "parameters",
                format!("land-cover index {} is both conifer and deciduous", v),
            ));
        }
        Ok(())
    }
}
