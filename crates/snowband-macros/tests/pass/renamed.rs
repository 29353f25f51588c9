use snowband_macros::Fluxes;

#[derive(Debug, Clone, Copy, Fluxes)]
#[fluxes(timeseries_name = "PackSeries")]
pub struct PackFluxes {
    pub swe: f64,
    #[fluxes(rename = "ri")]
    pub radiation_index: f64,
}

fn main() {
    let mut ts = PackSeries::with_capacity(1);
    ts.push(&PackFluxes { swe: 0.2, radiation_index: 1.1 });
    assert_eq!(PackFluxes::field_names(), &["swe", "ri"]);
    assert_eq!(ts.column("ri"), Some(&[1.1][..]));
    assert!(ts.column("radiation_index").is_none());
    let names: Vec<&str> = ts.columns().iter().map(|(n, _)| *n).collect();
    assert_eq!(names, vec!["swe", "ri"]);
}
