/// Pure Rust benchmarks of the snow band model.
///
/// Uses std::time::Instant for timing, a deterministic LCG PRNG for data generation,
/// and std::hint::black_box to prevent dead-code elimination.
/// Set RUST_LOG to see the model log.
use std::hint::black_box;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime};

use snowband_core::assimilation::{SnowObservation, Station, StationNetwork, WeightMatrix};
use snowband_core::bands::{BandGeometry, ElevationBand, HruExtent};
use snowband_core::basin::{Aspect, Hru, LandCover};
use snowband_core::context::RunContext;
use snowband_core::forcing::{ForcingSeries, HruForcing, TimeStep};
use snowband_core::snowpack::{ClassParameters, HruParameters, SnowParameters};
use snowband_core::traits::UniformGradients;
use snowband_core::{SnowBandModel, SnowResult};

const REPEATS: usize = 7;
const BANDS_PER_HRU: usize = 8;

struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as f64 / (1u64 << 31) as f64
    }
}

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 10, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// HRUs of `BANDS_PER_HRU` bands of 100 m, evenly split between groups.
fn make_basin(n_hrus: usize) -> SnowResult<(Vec<Hru>, BandGeometry)> {
    let mut hrus = Vec::with_capacity(n_hrus);
    let mut per_hru = Vec::with_capacity(n_hrus);
    let mut extents = Vec::with_capacity(n_hrus);
    for k in 0..n_hrus {
        let base = 800.0 + 50.0 * k as f64;
        let area = 1e6 * BANDS_PER_HRU as f64;
        let fraction = 1.0 / (3 * BANDS_PER_HRU) as f64;
        hrus.push(Hru {
            slope: 0.2,
            aspect: Aspect::from_code((k % 8) as u8 + 1).unwrap_or(Aspect::Flat),
            ..Hru::flat(k as u32 + 1, 46.5, base + 400.0, area)
        });
        per_hru.push(
            (0..BANDS_PER_HRU)
                .map(|b| {
                    [ElevationBand {
                        area: area * fraction,
                        fraction,
                        mean_elevation: base + 100.0 * b as f64 + 50.0,
                    }; 3]
                })
                .collect(),
        );
        extents.push(HruExtent {
            min_elevation: base,
            max_elevation: base + 100.0 * BANDS_PER_HRU as f64,
            area,
        });
    }
    Ok((hrus, BandGeometry::from_parts(100.0, per_hru, extents)?))
}

fn make_forcing(n_steps: usize, n_hrus: usize, seed: u64) -> SnowResult<ForcingSeries> {
    let mut rng = Lcg(seed);
    let steps = (0..n_steps)
        .map(|t| {
            let season = -8.0 + 20.0 * (t as f64 / 365.0 * std::f64::consts::TAU).sin().abs();
            (0..n_hrus)
                .map(|_| {
                    let tmin = season - 4.0 + 3.0 * rng.next_f64();
                    let precip = if rng.next_f64() < 0.3 {
                        0.015 * rng.next_f64()
                    } else {
                        0.0
                    };
                    HruForcing::new(tmin, tmin + 8.0, precip)
                })
                .collect()
        })
        .collect();
    ForcingSeries::new(steps, n_hrus)
}

fn make_network(n_hrus: usize, n_steps: usize) -> SnowResult<StationNetwork> {
    let mut station = Station::new("bench", LandCover::Open, 46.5, 7.0);
    for t in (0..n_steps).step_by(7) {
        let swe = 0.1 + 0.001 * (t % 100) as f64;
        station.insert(
            start() + chrono::Duration::days(t as i64),
            SnowObservation {
                height: None,
                swe: Some(swe),
                density: None,
            },
        );
    }
    let rows = vec![vec![1.0]; n_hrus];
    let weights = [
        WeightMatrix::empty(n_hrus),
        WeightMatrix::empty(n_hrus),
        WeightMatrix::from_rows(rows, 1)?,
    ];
    StationNetwork::with_weights(vec![station], weights, n_hrus)
}

fn make_model(n_hrus: usize, n_steps: usize) -> SnowResult<SnowBandModel> {
    let (hrus, geometry) = make_basin(n_hrus)?;
    let ids = hrus.iter().map(|h| h.id).collect();
    let end = start() + chrono::Duration::days(n_steps as i64);
    let ctx = RunContext::new(start(), end, TimeStep::DAILY, ids)?;
    let class = HruParameters::uniform(ClassParameters::new(0.0, 0.004)?);
    SnowBandModel::new(
        ctx,
        geometry,
        SnowParameters::default(),
        vec![class; n_hrus],
        &hrus,
        Box::new(UniformGradients::default()),
    )
}

/// Run a closure `REPEATS` times, return the median duration.
fn median_time<F: FnMut() -> SnowResult<()>>(mut f: F) -> SnowResult<Duration> {
    let mut times = Vec::with_capacity(REPEATS);
    for _ in 0..REPEATS {
        let start = Instant::now();
        f()?;
        times.push(start.elapsed());
    }
    times.sort();
    Ok(times[REPEATS / 2])
}

fn bench_run(
    sizes: &[(usize, usize)],
    assimilate: bool,
) -> SnowResult<Vec<(&'static str, usize, usize, Duration)>> {
    let name = if assimilate { "run+assim" } else { "run" };
    let mut results = Vec::new();

    for &(n_hrus, n_steps) in sizes {
        let forcing = make_forcing(n_steps, n_hrus, 42)?;

        let dur = median_time(|| {
            let mut model = make_model(n_hrus, n_steps)?;
            if assimilate {
                model = model.with_assimilation(make_network(n_hrus, n_steps)?)?;
            }
            black_box(model.run(&forcing)?);
            Ok(())
        })?;
        results.push((name, n_hrus, n_steps, dur));
    }
    Ok(results)
}

fn main() -> SnowResult<()> {
    env_logger::init();

    println!("Snow Band Model Benchmarks");
    println!("============================================================");
    println!("{:<12} {:>6} {:>7}   {:>12}", "Case", "HRUs", "Steps", "Median (ms)");
    println!("--------------------------------------------");

    let sizes = [(10, 3650), (100, 3650)];
    let mut all_results = bench_run(&sizes, false)?;
    all_results.extend(bench_run(&sizes, true)?);

    for (case, n_hrus, n_steps, dur) in &all_results {
        let ms = dur.as_secs_f64() * 1000.0;
        println!("{:<12} {:>6} {:>7}      {:>8.2}", case, n_hrus, n_steps, ms);
    }

    println!("============================================================");
    Ok(())
}
