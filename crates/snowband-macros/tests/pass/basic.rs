use snowband_macros::Fluxes;

#[derive(Debug, Clone, Copy, PartialEq, Fluxes)]
pub struct BandFluxes {
    pub rain: f64,
    pub snow: f64,
    pub melt: f64,
}

fn main() {
    let mut ts = BandFluxesTimeseries::with_capacity(4);
    assert!(ts.is_empty());
    ts.push(&BandFluxes { rain: 1.0, snow: 2.0, melt: 0.5 });
    ts.push(&BandFluxes { rain: 0.0, snow: 0.0, melt: 1.5 });

    assert_eq!(ts.len(), 2);
    assert_eq!(ts.melt, vec![0.5, 1.5]);
    assert_eq!(ts.get(1).map(|f| f.melt), Some(1.5));
    assert!(ts.get(2).is_none());
    assert_eq!(ts.column("snow"), Some(&[2.0, 0.0][..]));
    assert_eq!(ts.column("runoff"), None);
    assert_eq!(BandFluxes::field_names(), &["rain", "snow", "melt"]);
    assert_eq!(ts.get(0).unwrap().values(), [1.0, 2.0, 0.5]);

    let collected: BandFluxesTimeseries = (0..3)
        .map(|i| BandFluxes { rain: i as f64, snow: 0.0, melt: 0.0 })
        .collect();
    assert_eq!(collected.rain, vec![0.0, 1.0, 2.0]);
}
