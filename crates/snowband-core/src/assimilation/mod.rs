//! Station snow observations blended into the simulated packs.

pub mod blend;
pub mod engine;
pub mod stations;
pub mod tracker;

pub use blend::{blend, Blended};
pub use engine::Assimilator;
pub use stations::{IdwConfig, SnowObservation, Station, StationNetwork, WeightMatrix};
pub use tracker::Tracker;
