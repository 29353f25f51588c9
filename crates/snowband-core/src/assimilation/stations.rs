//! Snow stations and their fixed influence on HRUs.
//!
//! Every station belongs to one land-cover group and only corrects cells of
//! that group. Influence is a per-group `[hru][station]` weight matrix built
//! once, either from explicit values or by inverse-distance weighting.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::basin::{Hru, LandCover};
use crate::error::{SnowError, SnowResult};

/// Mean Earth radius [m].
const EARTH_RADIUS: f64 = 6_371_000.0;

/// One snow survey. Missing values are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnowObservation {
    /// Snow height [m].
    pub height: Option<f64>,
    /// Snow water equivalent [m].
    pub swe: Option<f64>,
    /// Bulk density [kg/m3].
    pub density: Option<f64>,
}

impl SnowObservation {
    /// Observed water equivalent, derived from height and density when not
    /// measured directly.
    pub fn water_equivalent(&self) -> Option<f64> {
        match (self.swe, self.height, self.density) {
            (Some(swe), _, _) if swe >= 0.0 => Some(swe),
            (_, Some(h), Some(rho)) if h >= 0.0 && rho > 0.0 => Some(h * rho / 1000.0),
            _ => None,
        }
    }

    /// Observed height when usable.
    pub fn positive_height(&self) -> Option<f64> {
        self.height.filter(|h| *h > 0.0)
    }
}

/// A snow station.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub name: String,
    pub cover: LandCover,
    /// Latitude [deg].
    pub latitude: f64,
    /// Longitude [deg].
    pub longitude: f64,
    observations: BTreeMap<NaiveDateTime, SnowObservation>,
}

impl Station {
    pub fn new(name: impl Into<String>, cover: LandCover, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            cover,
            latitude,
            longitude,
            observations: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, date: NaiveDateTime, observation: SnowObservation) {
        self.observations.insert(date, observation);
    }

    pub fn with_observation(mut self, date: NaiveDateTime, observation: SnowObservation) -> Self {
        self.insert(date, observation);
        self
    }

    /// Observation taken at the start of the step `date`.
    pub fn observation(&self, date: NaiveDateTime) -> Option<&SnowObservation> {
        self.observations.get(&date)
    }

    pub fn n_observations(&self) -> usize {
        self.observations.len()
    }
}

/// Great-circle distance [m] between two points given in degrees.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = p2 - p1;
    let dl = (lon2 - lon1).to_radians();
    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * a.sqrt().clamp(0.0, 1.0).asin()
}

/// Inverse-distance weighting configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdwConfig {
    /// Distance exponent.
    pub power: f64,
    /// Stations farther than this are ignored [m]. `None` keeps all.
    pub search_radius: Option<f64>,
    /// Distances below this put the HRU on the station [m].
    pub distance_tolerance: f64,
}

impl Default for IdwConfig {
    fn default() -> Self {
        Self {
            power: 2.0,
            search_radius: None,
            distance_tolerance: 1e-3,
        }
    }
}

impl IdwConfig {
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_search_radius(mut self, radius: f64) -> Self {
        self.search_radius = Some(radius);
        self
    }
}

/// Weights of the stations of one group, `[hru slot][station]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    n_stations: usize,
    values: Vec<f64>,
}

impl WeightMatrix {
    /// No station.
    pub fn empty(n_hrus: usize) -> Self {
        Self {
            n_stations: 0,
            values: Vec::with_capacity(n_hrus),
        }
    }

    /// Explicit weights, one row per HRU slot, each in [0, 1].
    pub fn from_rows(rows: Vec<Vec<f64>>, n_stations: usize) -> SnowResult<Self> {
        let mut values = Vec::with_capacity(rows.len() * n_stations);
        for (hru, row) in rows.into_iter().enumerate() {
            if row.len() != n_stations {
                return Err(SnowError::config(
                    "station weights",
                    format!(
                        "HRU slot {} has {} weights for {} stations",
                        hru,
                        row.len(),
                        n_stations
                    ),
                ));
            }
            if let Some(w) = row.iter().find(|w| !(0.0..=1.0).contains(*w)) {
                return Err(SnowError::config(
                    "station weights",
                    format!("weight {} of HRU slot {} is outside [0, 1]", w, hru),
                ));
            }
            values.extend(row);
        }
        Ok(Self { n_stations, values })
    }

    /// Inverse-distance weights from HRU centroids, normalised per HRU.
    pub fn inverse_distance(hrus: &[Hru], stations: &[&Station], config: &IdwConfig) -> Self {
        let n_stations = stations.len();
        let mut values = Vec::with_capacity(hrus.len() * n_stations);
        for hru in hrus {
            let distances: Vec<f64> = stations
                .iter()
                .map(|s| haversine(hru.latitude, hru.longitude, s.latitude, s.longitude))
                .collect();
            let mut row: Vec<f64> = distances
                .iter()
                .map(|&d| match config.search_radius {
                    Some(r) if d > r => 0.0,
                    _ if d <= config.distance_tolerance => f64::INFINITY,
                    _ => 1.0 / d.powf(config.power),
                })
                .collect();

            if row.iter().any(|w| w.is_infinite()) {
                row.iter_mut()
                    .for_each(|w| *w = if w.is_infinite() { 1.0 } else { 0.0 });
            }
            let total: f64 = row.iter().sum();
            if total > 0.0 {
                row.iter_mut().for_each(|w| *w /= total);
            }
            values.extend(row);
        }
        Self { n_stations, values }
    }

    pub fn n_stations(&self) -> usize {
        self.n_stations
    }

    pub fn n_hrus(&self) -> usize {
        if self.n_stations == 0 {
            0
        } else {
            self.values.len() / self.n_stations
        }
    }

    #[inline]
    pub fn get(&self, hru: usize, station: usize) -> f64 {
        self.values[hru * self.n_stations + station]
    }
}

/// Stations of one group with their weights.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverStations {
    pub stations: Vec<Station>,
    pub weights: WeightMatrix,
}

/// All stations of the basin, split by group.
#[derive(Debug, Clone, PartialEq)]
pub struct StationNetwork {
    groups: [CoverStations; 3],
}

fn split_by_cover(stations: Vec<Station>) -> [Vec<Station>; 3] {
    let mut groups: [Vec<Station>; 3] = Default::default();
    for s in stations {
        groups[s.cover.index()].push(s);
    }
    groups
}

impl StationNetwork {
    /// Stations with explicit weights, given per group in
    /// [`LandCover::ALL`] order and stations in input order within a group.
    pub fn with_weights(
        stations: Vec<Station>,
        weights: [WeightMatrix; 3],
        n_hrus: usize,
    ) -> SnowResult<Self> {
        let groups = split_by_cover(stations);
        for (cover, (list, w)) in LandCover::ALL.iter().zip(groups.iter().zip(&weights)) {
            if w.n_stations() != list.len() || (!list.is_empty() && w.n_hrus() != n_hrus) {
                return Err(SnowError::config(
                    "station weights",
                    format!(
                        "{} weights are {}x{} for {} HRUs and {} stations",
                        cover.name(),
                        w.n_hrus(),
                        w.n_stations(),
                        n_hrus,
                        list.len()
                    ),
                ));
            }
        }
        let [gc, gd, go] = groups;
        let [wc, wd, wo] = weights;
        Ok(Self {
            groups: [
                CoverStations {
                    stations: gc,
                    weights: wc,
                },
                CoverStations {
                    stations: gd,
                    weights: wd,
                },
                CoverStations {
                    stations: go,
                    weights: wo,
                },
            ],
        })
    }

    /// Stations weighted by inverse distance to the HRU centroids.
    pub fn with_idw(stations: Vec<Station>, hrus: &[Hru], config: &IdwConfig) -> Self {
        let groups = split_by_cover(stations).map(|list| {
            let refs: Vec<&Station> = list.iter().collect();
            let weights = WeightMatrix::inverse_distance(hrus, &refs, config);
            CoverStations {
                stations: list,
                weights,
            }
        });
        log::info!(
            "station network: {} conifer, {} deciduous, {} open stations",
            groups[0].stations.len(),
            groups[1].stations.len(),
            groups[2].stations.len()
        );
        Self { groups }
    }

    pub fn group(&self, cover: LandCover) -> &CoverStations {
        &self.groups[cover.index()]
    }

    pub fn n_stations(&self) -> usize {
        self.groups.iter().map(|g| g.stations.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 2, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn hru_at(id: u32, lat: f64, lon: f64) -> Hru {
        Hru {
            longitude: lon,
            ..Hru::flat(id, lat, 1000.0, 1.0e6)
        }
    }

    // -- observations --

    #[test]
    fn water_equivalent_falls_back_to_height_and_density() {
        let direct = SnowObservation {
            swe: Some(0.1),
            height: Some(0.5),
            density: Some(300.0),
        };
        assert_eq!(direct.water_equivalent(), Some(0.1));

        let derived = SnowObservation {
            swe: None,
            height: Some(0.5),
            density: Some(300.0),
        };
        assert!((derived.water_equivalent().unwrap() - 0.15).abs() < 1e-12);

        assert_eq!(SnowObservation::default().water_equivalent(), None);
    }

    #[test]
    fn station_lookup_by_date() {
        let s = Station::new("col", LandCover::Open, 46.0, 7.0).with_observation(
            date(3),
            SnowObservation {
                swe: Some(0.2),
                ..Default::default()
            },
        );
        assert!(s.observation(date(3)).is_some());
        assert!(s.observation(date(4)).is_none());
        assert_eq!(s.n_observations(), 1);
    }

    // -- distances and weights --

    #[test]
    fn haversine_one_degree_of_latitude() {
        let d = haversine(45.0, 7.0, 46.0, 7.0);
        assert!((d - 111_195.0).abs() < 10.0);
        assert_eq!(haversine(45.0, 7.0, 45.0, 7.0), 0.0);
    }

    #[test]
    fn idw_rows_are_normalised() {
        let a = Station::new("a", LandCover::Open, 46.0, 7.0);
        let b = Station::new("b", LandCover::Open, 46.2, 7.0);
        let hrus = vec![hru_at(1, 46.05, 7.0), hru_at(2, 46.1, 7.0)];
        let w = WeightMatrix::inverse_distance(&hrus, &[&a, &b], &IdwConfig::default());
        for hru in 0..2 {
            assert!((w.get(hru, 0) + w.get(hru, 1) - 1.0).abs() < 1e-12);
        }
        assert!(w.get(0, 0) > w.get(0, 1));
        assert!((w.get(1, 0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn higher_power_favours_the_nearest_station() {
        let a = Station::new("a", LandCover::Open, 46.0, 7.0);
        let b = Station::new("b", LandCover::Open, 46.2, 7.0);
        let hrus = vec![hru_at(1, 46.05, 7.0)];
        let linear = IdwConfig::default().with_power(1.0);
        let w1 = WeightMatrix::inverse_distance(&hrus, &[&a, &b], &linear);
        let w2 = WeightMatrix::inverse_distance(&hrus, &[&a, &b], &IdwConfig::default());
        assert!((w1.get(0, 0) - 0.75).abs() < 1e-3);
        assert!(w2.get(0, 0) > w1.get(0, 0));
    }

    #[test]
    fn idw_search_radius_and_coincident_station() {
        let near = Station::new("near", LandCover::Open, 46.0, 7.0);
        let far = Station::new("far", LandCover::Open, 47.0, 7.0);
        let hrus = vec![hru_at(1, 46.0, 7.0), hru_at(2, 46.1, 7.0), hru_at(3, 50.0, 7.0)];
        let cfg = IdwConfig::default().with_search_radius(50_000.0);
        let w = WeightMatrix::inverse_distance(&hrus, &[&near, &far], &cfg);
        assert_eq!(w.get(0, 0), 1.0);
        assert_eq!(w.get(0, 1), 0.0);
        assert_eq!(w.get(1, 0), 1.0);
        assert_eq!(w.get(2, 0), 0.0);
        assert_eq!(w.get(2, 1), 0.0);
    }

    #[test]
    fn explicit_weights_are_validated() {
        assert!(WeightMatrix::from_rows(vec![vec![0.5, 0.5], vec![1.0]], 2).is_err());
        assert!(WeightMatrix::from_rows(vec![vec![1.5]], 1).is_err());
        let w = WeightMatrix::from_rows(vec![vec![0.2, 0.8]], 2).unwrap();
        assert_eq!(w.get(0, 1), 0.8);
        assert_eq!(w.n_hrus(), 1);
    }

    // -- network --

    #[test]
    fn network_splits_stations_by_cover() {
        let stations = vec![
            Station::new("o1", LandCover::Open, 46.0, 7.0),
            Station::new("c1", LandCover::Conifer, 46.1, 7.0),
            Station::new("o2", LandCover::Open, 46.2, 7.0),
        ];
        let hrus = vec![hru_at(1, 46.1, 7.1)];
        let net = StationNetwork::with_idw(stations, &hrus, &IdwConfig::default());
        assert_eq!(net.n_stations(), 3);
        assert_eq!(net.group(LandCover::Open).stations.len(), 2);
        assert_eq!(net.group(LandCover::Open).stations[1].name, "o2");
        assert_eq!(net.group(LandCover::Deciduous).weights.n_stations(), 0);
    }

    #[test]
    fn explicit_network_checks_dimensions() {
        let stations = vec![Station::new("o1", LandCover::Open, 46.0, 7.0)];
        let ok = [
            WeightMatrix::empty(2),
            WeightMatrix::empty(2),
            WeightMatrix::from_rows(vec![vec![1.0], vec![0.5]], 1).unwrap(),
        ];
        assert!(StationNetwork::with_weights(stations.clone(), ok, 2).is_ok());

        let bad = [
            WeightMatrix::empty(2),
            WeightMatrix::empty(2),
            WeightMatrix::from_rows(vec![vec![1.0]], 1).unwrap(),
        ];
        assert!(StationNetwork::with_weights(stations, bad, 2).is_err());
    }
}
