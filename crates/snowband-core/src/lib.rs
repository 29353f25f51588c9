//! snowband-core: elevation-band snowpack energy balance in Rust.
//!
//! Every HRU is split into elevation bands per land-cover group. Each band
//! carries a multi-state snowpack driven by distributed forcing and a
//! radiation index, and station observations can be blended into the state.

pub mod assimilation;
pub mod bands;
pub mod basin;
pub mod config;
pub mod context;
pub mod corrections;
pub mod elevation;
pub mod error;
pub mod forcing;
pub mod model;
pub mod outputs;
pub mod persistence;
pub mod radiation;
pub mod raster;
pub mod snowpack;
pub mod traits;

pub use error::{SnowError, SnowResult};
pub use model::{SnowBandModel, StepOutput};
