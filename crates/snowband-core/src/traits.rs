/// Capability interfaces injected into the snow model.
///
/// The vertical gradients and the rain/snow threshold belong to whichever
/// interpolation submodel feeds the forcing. The model only sees them through
/// [`GradientProvider`], chosen once at configuration time.
use chrono::NaiveDateTime;

use crate::elevation::{GRAD_P_DEFAULT, GRAD_T_DEFAULT};

/// Vertical gradients applying to one HRU for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalGradients {
    /// Temperature lapse rate [C/100m], positive when colder aloft.
    pub temperature: f64,
    /// Linear precipitation gradient [m^-1].
    pub precipitation: f64,
    /// Rain/snow threshold temperature [C].
    pub threshold: f64,
}

impl Default for VerticalGradients {
    fn default() -> Self {
        Self {
            temperature: GRAD_T_DEFAULT,
            precipitation: GRAD_P_DEFAULT,
            threshold: 0.0,
        }
    }
}

/// Source of vertical gradients, one per interpolation submodel.
pub trait GradientProvider {
    /// Gradients of HRU slot `hru` for the step starting at `date`.
    fn gradients(&self, hru: usize, date: NaiveDateTime) -> VerticalGradients;
}

/// Same gradients everywhere, all the time.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformGradients(pub VerticalGradients);

impl GradientProvider for UniformGradients {
    fn gradients(&self, _hru: usize, _date: NaiveDateTime) -> VerticalGradients {
        self.0
    }
}

/// Gradients given per HRU slot, constant in time.
#[derive(Debug, Clone, Default)]
pub struct PerHruGradients(pub Vec<VerticalGradients>);

impl GradientProvider for PerHruGradients {
    fn gradients(&self, hru: usize, _date: NaiveDateTime) -> VerticalGradients {
        self.0[hru]
    }
}

impl<G: GradientProvider + ?Sized> GradientProvider for Box<G> {
    fn gradients(&self, hru: usize, date: NaiveDateTime) -> VerticalGradients {
        (**self).gradients(hru, date)
    }
}

/// Flat-array conversion of a model state, used by the bindings.
pub trait ModelState: Sized {
    fn to_vec(&self) -> Vec<f64>;
    fn from_slice(arr: &[f64]) -> Result<Self, String>;
    fn array_len(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn uniform_ignores_hru_and_date() {
        let g = UniformGradients(VerticalGradients {
            temperature: 0.5,
            precipitation: 0.0,
            threshold: 1.0,
        });
        assert_eq!(g.gradients(3, now()).threshold, 1.0);
    }

    #[test]
    fn boxed_provider_delegates() {
        let g: Box<dyn GradientProvider> = Box::new(PerHruGradients(vec![
            VerticalGradients::default(),
            VerticalGradients {
                temperature: 1.0,
                ..Default::default()
            },
        ]));
        assert_eq!(g.gradients(1, now()).temperature, 1.0);
        assert_eq!(g.gradients(0, now()).temperature, GRAD_T_DEFAULT);
    }
}
