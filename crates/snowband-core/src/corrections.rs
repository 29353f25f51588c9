/// Basin-wide stock corrections.
///
/// A correction scales and shifts the snow water equivalent of every band
/// and group of its HRUs while the date lies in its window. Corrections
/// active on the same step are all computed from the uncorrected state.
use chrono::NaiveDateTime;

use crate::bands::BandLayout;
use crate::error::{SnowError, SnowResult};
use crate::snowpack::constants::MIN_STOCK;
use crate::snowpack::SnowState;

/// Height over water equivalent given to snow added on bare ground [-].
const ADDED_SNOW_HEIGHT_RATIO: f64 = 2.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    /// HRU ids corrected; `None` for the whole basin.
    pub hrus: Option<Vec<u32>>,
    /// First date of the window, inclusive.
    pub start: NaiveDateTime,
    /// Last date of the window, inclusive.
    pub end: NaiveDateTime,
    /// Water equivalent added [m].
    pub additive: f64,
    /// Factor applied to the water equivalent [-].
    pub multiplicative: f64,
}

impl Correction {
    pub fn new(
        hrus: Option<Vec<u32>>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        additive: f64,
        multiplicative: f64,
    ) -> SnowResult<Self> {
        if end < start {
            return Err(SnowError::config(
                "corrections",
                format!("window ends ({}) before it starts ({})", end, start),
            ));
        }
        if multiplicative.is_nan() || multiplicative < 0.0 || !additive.is_finite() {
            return Err(SnowError::config(
                "corrections",
                format!("invalid correction {} + x * {}", additive, multiplicative),
            ));
        }
        Ok(Self {
            hrus,
            start,
            end,
            additive,
            multiplicative,
        })
    }

    pub fn is_active(&self, date: NaiveDateTime) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn applies_to(&self, hru_id: u32) -> bool {
        self.hrus.as_ref().map_or(true, |ids| ids.contains(&hru_id))
    }

    /// Change of `stock` under this correction.
    fn delta(&self, stock: f64) -> f64 {
        stock * self.multiplicative + self.additive - stock
    }
}

/// Apply every correction active at `date`. Returns the number of cells
/// whose stock changed.
pub fn apply(
    corrections: &[Correction],
    date: NaiveDateTime,
    hru_ids: &[u32],
    layout: &BandLayout,
    state: &mut SnowState,
) -> usize {
    let active: Vec<&Correction> = corrections.iter().filter(|c| c.is_active(date)).collect();
    if active.is_empty() {
        return 0;
    }

    let mut changed = 0;
    for (hru, &id) in hru_ids.iter().enumerate() {
        let applying: Vec<&&Correction> = active.iter().filter(|c| c.applies_to(id)).collect();
        if applying.is_empty() {
            continue;
        }
        for i in layout.hru_cells(hru) {
            let cell = &mut state.cells[i];
            let delta: f64 = applying.iter().map(|c| c.delta(cell.stock)).sum();
            if delta == 0.0 {
                continue;
            }
            let mut stock = (cell.stock + delta).max(0.0);
            if stock < MIN_STOCK {
                stock = 0.0;
            }
            let height = if cell.stock > 0.0 {
                cell.height * stock / cell.stock
            } else {
                stock * ADDED_SNOW_HEIGHT_RATIO
            };
            cell.rescale(stock, height);
            changed += 1;
        }
    }
    log::debug!("{}: {} corrections changed {} cells", date, active.len(), changed);
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basin::LandCover;
    use crate::snowpack::SnowCell;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 3, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn state(layout: &BandLayout) -> SnowState {
        let mut s = SnowState::initialize(layout);
        for c in &mut s.cells {
            *c = SnowCell {
                stock: 0.1,
                height: 0.4,
                heat: -1000.0,
                water: 0.002,
                albedo: 0.6,
            };
        }
        s
    }

    #[test]
    fn window_is_inclusive() {
        let c = Correction::new(None, date(2), date(4), 0.0, 1.1).unwrap();
        assert!(!c.is_active(date(1)));
        assert!(c.is_active(date(2)));
        assert!(c.is_active(date(4)));
        assert!(!c.is_active(date(5)));
    }

    #[test]
    fn rejects_inverted_window_and_negative_factor() {
        assert!(Correction::new(None, date(4), date(2), 0.0, 1.0).is_err());
        assert!(Correction::new(None, date(2), date(4), 0.0, -1.0).is_err());
    }

    #[test]
    fn multiplicative_scales_everything() {
        let layout = BandLayout::new(vec![1]);
        let mut s = state(&layout);
        let c = Correction::new(None, date(1), date(9), 0.0, 1.5).unwrap();
        assert_eq!(apply(&[c], date(3), &[7], &layout, &mut s), 3);
        let cell = s.cells[layout.index(0, 0, LandCover::Open)];
        assert!((cell.stock - 0.15).abs() < 1e-12);
        assert!((cell.height - 0.6).abs() < 1e-12);
        assert!((cell.heat - -1500.0).abs() < 1e-9);
        assert!((cell.water - 0.003).abs() < 1e-15);
    }

    #[test]
    fn corrections_combine_from_the_same_state() {
        let layout = BandLayout::new(vec![1]);
        let mut s = state(&layout);
        let both = [
            Correction::new(None, date(1), date(9), 0.0, 2.0).unwrap(),
            Correction::new(None, date(1), date(9), 0.05, 1.0).unwrap(),
        ];
        apply(&both, date(3), &[7], &layout, &mut s);
        // 0.1 + (0.2 - 0.1) + 0.05, whatever the order.
        assert!((s.cells[0].stock - 0.25).abs() < 1e-12);
    }

    #[test]
    fn only_listed_hrus_are_corrected() {
        let layout = BandLayout::new(vec![1, 2]);
        let mut s = state(&layout);
        let c = Correction::new(Some(vec![12]), date(1), date(9), -0.2, 1.0).unwrap();
        assert_eq!(apply(&[c], date(3), &[11, 12], &layout, &mut s), 6);
        assert_eq!(s.cells[0].stock, 0.1);
        for i in layout.hru_cells(1) {
            assert_eq!(s.cells[i], SnowCell { albedo: 0.6, ..Default::default() });
        }
    }

    #[test]
    fn inactive_date_changes_nothing() {
        let layout = BandLayout::new(vec![1]);
        let mut s = state(&layout);
        let before = s.clone();
        let c = Correction::new(None, date(5), date(9), 0.1, 1.0).unwrap();
        assert_eq!(apply(&[c], date(3), &[7], &layout, &mut s), 0);
        assert_eq!(s, before);
    }
}
