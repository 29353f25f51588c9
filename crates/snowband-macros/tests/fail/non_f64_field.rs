use snowband_macros::Fluxes;

#[derive(Fluxes)]
pub struct BadFluxes {
    pub melt: f64,
    pub band: usize,
}

fn main() {}
