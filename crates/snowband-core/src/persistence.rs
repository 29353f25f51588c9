//! Snowpack checkpoint files.
//!
//! Semicolon-separated text, one row per `(hru, band)` with the five state
//! values of each land-cover group:
//!
//! ```text
//! SNOWBAND STATE;1
//! LABEL;end of calibration
//! DATE;2021-10-01 00:00
//! HRU-BAND;CONIFER STOCK;CONIFER HEIGHT;...;OPEN ALBEDO
//! 12-1;0.1;0.4;-2000;0;0.7;...
//! ```
//!
//! Values are written with the shortest representation that parses back to
//! the same `f64`, so a reload is exact.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;

use crate::bands::BandLayout;
use crate::basin::LandCover;
use crate::error::{SnowError, SnowResult};
use crate::snowpack::constants::CELL_STATE_SIZE;
use crate::snowpack::{SnowCell, SnowState};

pub const STATE_MAGIC: &str = "SNOWBAND STATE";
pub const STATE_VERSION: u32 = 1;
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

const VALUE_NAMES: [&str; CELL_STATE_SIZE] = ["STOCK", "HEIGHT", "HEAT", "WATER", "ALBEDO"];
const N_COLUMNS: usize = CELL_STATE_SIZE * LandCover::COUNT;

/// A loaded checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub label: String,
    pub date: NaiveDateTime,
    pub state: SnowState,
}

fn header() -> String {
    let mut h = String::from("HRU-BAND");
    for cover in LandCover::ALL {
        for v in VALUE_NAMES {
            h.push(';');
            h.push_str(&cover.name().to_uppercase());
            h.push(' ');
            h.push_str(v);
        }
    }
    h
}

/// Write `state` to `out`. `hru_ids` gives the id of every HRU slot.
pub fn write_state<W: Write>(
    out: &mut W,
    label: &str,
    date: NaiveDateTime,
    hru_ids: &[u32],
    layout: &BandLayout,
    state: &SnowState,
) -> std::io::Result<()> {
    writeln!(out, "{};{}", STATE_MAGIC, STATE_VERSION)?;
    writeln!(out, "LABEL;{}", label.replace(&['\n', '\r'][..], " "))?;
    writeln!(out, "DATE;{}", date.format(DATE_FORMAT))?;
    writeln!(out, "{}", header())?;
    for (hru, id) in hru_ids.iter().enumerate() {
        for band in 0..layout.n_bands(hru) {
            write!(out, "{}-{}", id, band + 1)?;
            for cover in LandCover::ALL {
                for v in state.cells[layout.index(hru, band, cover)].to_array() {
                    write!(out, ";{}", v)?;
                }
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Save `state` to the file at `path`.
pub fn save(
    path: &Path,
    label: &str,
    date: NaiveDateTime,
    hru_ids: &[u32],
    layout: &BandLayout,
    state: &SnowState,
) -> SnowResult<()> {
    let file = File::create(path).map_err(|e| SnowError::io(path, e))?;
    let mut out = BufWriter::new(file);
    write_state(&mut out, label, date, hru_ids, layout, state)
        .and_then(|_| out.flush())
        .map_err(|e| SnowError::io(path, e))?;
    log::info!("state of {} written to {}", date, path.display());
    Ok(())
}

/// Line reader tracking line numbers for error messages.
struct Lines<'a, R> {
    source: &'a str,
    inner: std::io::Lines<R>,
    line: usize,
}

impl<'a, R: BufRead> Lines<'a, R> {
    fn error(&self, message: impl std::fmt::Display) -> SnowError {
        SnowError::state(self.source, format!("line {}: {}", self.line, message))
    }

    fn next_line(&mut self) -> SnowResult<Option<String>> {
        match self.inner.next() {
            None => Ok(None),
            Some(Ok(l)) => {
                self.line += 1;
                Ok(Some(l.trim_end_matches('\r').to_string()))
            }
            Some(Err(e)) => Err(SnowError::io(self.source, e)),
        }
    }

    /// Next line of the form `KEY;value`, returning `value`.
    fn keyed(&mut self, key: &str) -> SnowResult<String> {
        let line = self
            .next_line()?
            .ok_or_else(|| SnowError::state(self.source, format!("missing {} line", key)))?;
        match line.split_once(';') {
            Some((k, v)) if k.trim().eq_ignore_ascii_case(key) => Ok(v.to_string()),
            _ => Err(self.error(format!("expected {};...", key))),
        }
    }
}

/// Read a checkpoint for the HRU slots `hru_ids` laid out as `layout`.
///
/// Every band of every simulated HRU must appear exactly once. Rows of HRUs
/// that are not simulated are skipped.
pub fn read_state<R: BufRead>(
    input: R,
    source: &str,
    hru_ids: &[u32],
    layout: &BandLayout,
) -> SnowResult<Checkpoint> {
    let mut lines = Lines {
        source,
        inner: input.lines(),
        line: 0,
    };

    let version = lines.keyed(STATE_MAGIC)?;
    if version.trim().parse::<u32>().ok() != Some(STATE_VERSION) {
        return Err(lines.error(format!("unsupported version {}", version.trim())));
    }
    let label = lines.keyed("LABEL")?;
    let date_str = lines.keyed("DATE")?;
    let date = NaiveDateTime::parse_from_str(date_str.trim(), DATE_FORMAT)
        .map_err(|e| lines.error(format!("invalid date '{}': {}", date_str.trim(), e)))?;
    let columns = lines.keyed("HRU-BAND")?;
    if columns.split(';').count() != N_COLUMNS {
        return Err(lines.error(format!("expected {} value columns", N_COLUMNS)));
    }

    let mut state = SnowState::initialize(layout);
    let mut seen = HashSet::new();
    let mut skipped = 0usize;

    while let Some(line) = lines.next_line()? {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split(';');
        let key = fields.next().unwrap_or_default().trim();
        let (id, band) = key
            .split_once('-')
            .and_then(|(h, b)| Some((h.parse::<u32>().ok()?, b.parse::<usize>().ok()?)))
            .filter(|&(_, b)| b >= 1)
            .ok_or_else(|| lines.error(format!("invalid row key '{}'", key)))?;

        let values = fields
            .map(|f| f.trim().parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| lines.error(format!("invalid value: {}", e)))?;
        if values.len() != N_COLUMNS {
            return Err(lines.error(format!(
                "expected {} values, found {}",
                N_COLUMNS,
                values.len()
            )));
        }

        let Some(hru) = hru_ids.iter().position(|&h| h == id) else {
            skipped += 1;
            continue;
        };
        let band = band - 1;
        if band >= layout.n_bands(hru) {
            return Err(lines.error(format!(
                "HRU {} has {} bands, found band {}",
                id,
                layout.n_bands(hru),
                band + 1
            )));
        }
        if !seen.insert((hru, band)) {
            return Err(lines.error(format!("HRU {} band {} listed twice", id, band + 1)));
        }
        for (g, cover) in LandCover::ALL.into_iter().enumerate() {
            let v = &values[g * CELL_STATE_SIZE..(g + 1) * CELL_STATE_SIZE];
            state.cells[layout.index(hru, band, cover)] =
                SnowCell::from_array([v[0], v[1], v[2], v[3], v[4]]);
        }
    }

    for (hru, id) in hru_ids.iter().enumerate() {
        for band in 0..layout.n_bands(hru) {
            if !seen.contains(&(hru, band)) {
                return Err(SnowError::state(
                    source,
                    format!("HRU {} band {} is missing", id, band + 1),
                ));
            }
        }
    }
    if skipped > 0 {
        log::warn!("{}: {} rows of non-simulated HRUs skipped", source, skipped);
    }

    Ok(Checkpoint { label, date, state })
}

/// Load the checkpoint at `path`.
pub fn load(path: &Path, hru_ids: &[u32], layout: &BandLayout) -> SnowResult<Checkpoint> {
    let file = File::open(path).map_err(|e| SnowError::io(path, e))?;
    let source = path.display().to_string();
    let checkpoint = read_state(BufReader::new(file), &source, hru_ids, layout)?;
    log::info!("state of {} loaded from {}", checkpoint.date, source);
    Ok(checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 10, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    fn sample(layout: &BandLayout) -> SnowState {
        let mut s = SnowState::initialize(layout);
        for (i, c) in s.cells.iter_mut().enumerate() {
            let x = i as f64;
            *c = SnowCell {
                stock: 0.1 + x / 3.0,
                height: 0.35 + x / 7.0,
                heat: -1234.5678 * x,
                water: 1e-7 * x,
                albedo: 0.8 / (1.0 + x),
            };
        }
        s
    }

    fn write_to_string(layout: &BandLayout, ids: &[u32], state: &SnowState) -> String {
        let mut buf = Vec::new();
        write_state(&mut buf, "test run", date(), ids, layout, state).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_has_fifteen_columns() {
        let h = header();
        assert_eq!(h.split(';').count(), 16);
        assert!(h.contains("CONIFER STOCK"));
        assert!(h.ends_with("OPEN ALBEDO"));
    }

    #[test]
    fn round_trip_is_exact() {
        let layout = BandLayout::new(vec![2, 3]);
        let ids = [12, 40];
        let state = sample(&layout);
        let text = write_to_string(&layout, &ids, &state);
        let cp = read_state(text.as_bytes(), "mem", &ids, &layout).unwrap();
        assert_eq!(cp.label, "test run");
        assert_eq!(cp.date, date());
        assert_eq!(cp.state, state);
    }

    #[test]
    fn rows_are_keyed_by_id_and_one_based_band() {
        let layout = BandLayout::new(vec![2]);
        let text = write_to_string(&layout, &[5], &sample(&layout));
        let rows: Vec<&str> = text.lines().skip(4).collect();
        assert!(rows[0].starts_with("5-1;"));
        assert!(rows[1].starts_with("5-2;"));
    }

    #[test]
    fn rejects_wrong_version() {
        let layout = BandLayout::new(vec![1]);
        let text = write_to_string(&layout, &[5], &sample(&layout))
            .replacen("SNOWBAND STATE;1", "SNOWBAND STATE;2", 1);
        let err = read_state(text.as_bytes(), "mem", &[5], &layout).unwrap_err();
        assert!(matches!(err, SnowError::State { .. }));
    }

    #[test]
    fn rejects_duplicate_missing_and_out_of_range_bands() {
        let layout = BandLayout::new(vec![2]);
        let text = write_to_string(&layout, &[5], &sample(&layout));
        let mut lines: Vec<&str> = text.lines().collect();

        let dup = lines[4].to_string();
        let mut with_dup = lines.clone();
        with_dup.push(&dup);
        assert!(read_state(with_dup.join("\n").as_bytes(), "mem", &[5], &layout).is_err());

        lines.pop();
        assert!(read_state(lines.join("\n").as_bytes(), "mem", &[5], &layout).is_err());

        let small = BandLayout::new(vec![1]);
        assert!(read_state(text.as_bytes(), "mem", &[5], &small).is_err());
    }

    #[test]
    fn rejects_short_rows_and_bad_numbers() {
        let layout = BandLayout::new(vec![1]);
        let text = write_to_string(&layout, &[5], &sample(&layout));
        let short = text.trim_end().rsplit_once(';').unwrap().0.to_string();
        assert!(read_state(short.as_bytes(), "mem", &[5], &layout).is_err());

        let bad = text.replacen("5-1;", "5-1;abc;", 1);
        assert!(read_state(bad.as_bytes(), "mem", &[5], &layout).is_err());
    }

    #[test]
    fn skips_hrus_not_simulated() {
        let layout = BandLayout::new(vec![1, 1]);
        let state = sample(&layout);
        let text = write_to_string(&layout, &[5, 6], &state);
        let sub = BandLayout::new(vec![1]);
        let cp = read_state(text.as_bytes(), "mem", &[6], &sub).unwrap();
        assert_eq!(cp.state.cells[..], state.cells[3..6]);
    }

    #[test]
    fn missing_hru_is_an_error() {
        let layout = BandLayout::new(vec![1]);
        let text = write_to_string(&layout, &[5], &sample(&layout));
        let two = BandLayout::new(vec![1, 1]);
        assert!(read_state(text.as_bytes(), "mem", &[5, 9], &two).is_err());
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.csv");
        let layout = BandLayout::new(vec![3]);
        let state = sample(&layout);
        save(&path, "file", date(), &[1], &layout, &state).unwrap();
        let cp = load(&path, &[1], &layout).unwrap();
        assert_eq!(cp.state, state);
        assert!(load(&dir.path().join("absent.csv"), &[1], &layout).is_err());
    }
}
