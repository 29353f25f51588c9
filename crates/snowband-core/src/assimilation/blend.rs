//! Recursive confidence-weighted blending of one observation into one value.
//!
//! The current value is split into a simulated part and a part already
//! explained by earlier observations of the cycle. The new observation,
//! corrected for the observed part, is weighted against the simulated part
//! with the weight the cycle has not yet spent.

/// Outcome of a blend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blended {
    /// Blended value.
    pub value: f64,
    /// Share of `value` still attributed to the simulation [-].
    pub sim_fraction: f64,
}

/// Blend `measured` into `current`.
///
/// `reference` is the value left by the previous blend of the cycle,
/// `cumulative_weight` the weight spent so far, `weight` the weight of this
/// observation and `sim_fraction` the simulated share of `reference`.
pub fn blend(
    measured: f64,
    current: f64,
    reference: f64,
    cumulative_weight: f64,
    weight: f64,
    sim_fraction: f64,
) -> Blended {
    let remaining = 1.0 - cumulative_weight.min(1.0);
    let sim_part = sim_fraction * reference + (current - reference);
    let obs_part = current - sim_part;
    let adjusted = measured - obs_part;

    let denominator = remaining + weight;
    if denominator <= 0.0 {
        return Blended {
            value: current,
            sim_fraction,
        };
    }
    let sim_contribution = sim_part * remaining / denominator;
    let value = obs_part + weight * adjusted / denominator + sim_contribution;

    Blended {
        value,
        sim_fraction: if value == 0.0 {
            1.0
        } else {
            sim_contribution / value
        },
    }
}
