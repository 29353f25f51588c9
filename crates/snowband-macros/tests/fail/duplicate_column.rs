use snowband_macros::Fluxes;

#[derive(Fluxes)]
pub struct BadFluxes {
    pub swe: f64,
    #[fluxes(rename = "swe")]
    pub stock: f64,
}

fn main() {}
