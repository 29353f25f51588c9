//! Per-run simulation context.
//!
//! Holds only what the components read: the simulated period, the time step
//! and the ordered list of simulated HRU ids. Every component receives it at
//! construction instead of reaching for a basin-wide object.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};

use crate::error::{SnowError, SnowResult};
use crate::forcing::TimeStep;

#[derive(Debug, Clone)]
pub struct RunContext {
    start: NaiveDateTime,
    end: NaiveDateTime,
    time_step: TimeStep,
    hru_ids: Vec<u32>,
    slots: HashMap<u32, usize>,
}

impl RunContext {
    /// `end` is exclusive: the last step starts at `end - time_step`.
    pub fn new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        time_step: TimeStep,
        hru_ids: Vec<u32>,
    ) -> SnowResult<Self> {
        if end <= start {
            return Err(SnowError::config(
                "run context",
                format!("end date {} is not after start date {}", end, start),
            ));
        }
        if hru_ids.is_empty() {
            return Err(SnowError::config("run context", "no simulated HRU"));
        }
        let mut slots = HashMap::with_capacity(hru_ids.len());
        for (slot, &id) in hru_ids.iter().enumerate() {
            if slots.insert(id, slot).is_some() {
                return Err(SnowError::config(
                    "run context",
                    format!("HRU {} listed twice", id),
                ));
            }
        }
        Ok(Self {
            start,
            end,
            time_step,
            hru_ids,
            slots,
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn time_step(&self) -> TimeStep {
        self.time_step
    }

    /// Simulated HRU ids, in slot order.
    pub fn hru_ids(&self) -> &[u32] {
        &self.hru_ids
    }

    pub fn n_hrus(&self) -> usize {
        self.hru_ids.len()
    }

    /// Position of an HRU id in the simulated list.
    pub fn slot_of(&self, id: u32) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    /// Number of whole steps in the simulated period.
    pub fn n_steps(&self) -> usize {
        let total = (self.end - self.start).num_seconds();
        (total / (self.time_step.hours() as i64 * 3600)) as usize
    }

    /// Start date of step `t`.
    pub fn date_of(&self, t: usize) -> NaiveDateTime {
        self.start + Duration::hours(t as i64 * self.time_step.hours() as i64)
    }

    /// True while `date` lies within the first simulated year.
    pub fn in_first_year(&self, date: NaiveDateTime) -> bool {
        date < self.start + Duration::days(365)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn daily_step_count() {
        let ctx =
            RunContext::new(dt(2020, 1, 1), dt(2020, 1, 11), TimeStep::DAILY, vec![3, 7]).unwrap();
        assert_eq!(ctx.n_steps(), 10);
        assert_eq!(ctx.date_of(2), dt(2020, 1, 3));
        assert_eq!(ctx.slot_of(7), Some(1));
        assert_eq!(ctx.slot_of(8), None);
    }

    #[test]
    fn sub_daily_dates() {
        let step = TimeStep::from_hours(6).unwrap();
        let ctx = RunContext::new(dt(2020, 1, 1), dt(2020, 1, 2), step, vec![1]).unwrap();
        assert_eq!(ctx.n_steps(), 4);
        assert_eq!(ctx.date_of(3), dt(2020, 1, 1) + Duration::hours(18));
    }

    #[test]
    fn rejects_duplicate_hru() {
        let ctx = RunContext::new(dt(2020, 1, 1), dt(2020, 2, 1), TimeStep::DAILY, vec![1, 1]);
        assert!(ctx.is_err());
    }

    #[test]
    fn rejects_empty_period() {
        let ctx = RunContext::new(dt(2020, 1, 1), dt(2020, 1, 1), TimeStep::DAILY, vec![1]);
        assert!(ctx.is_err());
    }

    #[test]
    fn first_year_window() {
        let ctx =
            RunContext::new(dt(2020, 1, 1), dt(2022, 1, 1), TimeStep::DAILY, vec![1]).unwrap();
        assert!(ctx.in_first_year(dt(2020, 12, 30)));
        assert!(!ctx.in_first_year(dt(2021, 6, 1)));
    }
}
