//! Multi-state snowpack of one elevation band and land-cover group.
//!
//! Stock, height, heat content, retained water and albedo are advanced by an
//! energy balance combining conduction, rain heat, ground heat, radiation
//! melt, compaction and liquid-water retention.

pub mod constants;
pub mod params;
pub mod processes;
pub mod run;
pub mod state;

pub use params::{ClassParameters, HruParameters, SnowParameters};
pub use run::{step, CellFluxes, CellFluxesTimeseries, CellForcing};
pub use state::{SnowCell, SnowState};
