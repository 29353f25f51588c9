//! Parameter file reader.
//!
//! Semicolon-separated `KEY;value` lines followed by a per-HRU table of melt
//! parameters. `#` starts a comment; blank lines are ignored; keys are
//! case-insensitive.
//!
//! ```text
//! SNOWBAND PARAMETERS;1
//! BAND HEIGHT;100
//! MAX DENSITY;0.45
//! CONIFER INDICES;1;2
//! HRU;CONIFER THRESHOLD;CONIFER RATE;DECIDUOUS THRESHOLD;DECIDUOUS RATE;OPEN THRESHOLD;OPEN RATE
//! 1;-1.0;0.012;-0.5;0.014;0.0;0.016
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{SnowError, SnowResult};
use crate::snowpack::{ClassParameters, HruParameters, SnowParameters};

pub const PARAMETERS_MAGIC: &str = "SNOWBAND PARAMETERS";
pub const PARAMETERS_VERSION: u32 = 1;

/// Contents of a parameter file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterFile {
    pub snow: SnowParameters,
    pub hrus: BTreeMap<u32, HruParameters>,
}

impl ParameterFile {
    /// Melt parameters of the HRU slots `hru_ids`, in slot order.
    pub fn hru_parameters(&self, hru_ids: &[u32]) -> SnowResult<Vec<HruParameters>> {
        hru_ids
            .iter()
            .map(|id| {
                self.hrus.get(id).copied().ok_or_else(|| {
                    SnowError::config("parameters", format!("no melt parameters for HRU {}", id))
                })
            })
            .collect()
    }
}

fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(l, _)| l).trim()
}

struct Reader<'a> {
    file: &'a str,
    line: usize,
}

impl Reader<'_> {
    fn error(&self, message: impl Into<String>) -> SnowError {
        SnowError::parse(self.file, self.line, message)
    }

    fn number<T: std::str::FromStr>(&self, key: &str, value: &str) -> SnowResult<T> {
        value
            .trim()
            .parse()
            .map_err(|_| self.error(format!("{}: '{}' is not a number", key, value.trim())))
    }

    fn single<'v>(&self, key: &str, values: &[&'v str]) -> SnowResult<&'v str> {
        match values {
            [v] => Ok(v),
            _ => Err(self.error(format!("{} takes one value, found {}", key, values.len()))),
        }
    }
}

/// Read a parameter file from `input`; `file` names it in errors.
pub fn read_parameters<R: BufRead>(input: R, file: &str) -> SnowResult<ParameterFile> {
    let mut reader = Reader { file, line: 0 };
    let mut snow = SnowParameters::default();
    let mut band_height = None;
    let mut seen_keys: Vec<String> = Vec::new();
    let mut hrus = BTreeMap::new();
    let mut in_table = false;
    let mut versioned = false;

    for line in input.lines() {
        reader.line += 1;
        let line = line.map_err(|e| SnowError::io(file, e))?;
        let content = strip_comment(&line);
        if content.is_empty() {
            continue;
        }
        let mut fields = content.split(';').map(str::trim);
        let key = fields.next().unwrap_or_default().to_uppercase();
        let values: Vec<&str> = fields.collect();

        if !versioned {
            if key != PARAMETERS_MAGIC {
                return Err(reader.error(format!(
                    "expected {};{}",
                    PARAMETERS_MAGIC, PARAMETERS_VERSION
                )));
            }
            let v: u32 = reader.number(&key, reader.single(&key, &values)?)?;
            if v != PARAMETERS_VERSION {
                return Err(reader.error(format!("unsupported version {}", v)));
            }
            versioned = true;
            continue;
        }

        if in_table {
            let id: u32 = reader.number("HRU", &key)?;
            if values.len() != 6 {
                return Err(reader.error(format!(
                    "HRU {}: expected 6 values, found {}",
                    id,
                    values.len()
                )));
            }
            let mut nums = [0.0; 6];
            for (n, v) in nums.iter_mut().zip(&values) {
                *n = reader.number("HRU", v)?;
            }
            let class = |i: usize| {
                ClassParameters::new(nums[2 * i], nums[2 * i + 1])
                    .map_err(|e| reader.error(format!("HRU {}: {}", id, e)))
            };
            let params = HruParameters {
                classes: [class(0)?, class(1)?, class(2)?],
            };
            if hrus.insert(id, params).is_some() {
                return Err(reader.error(format!("HRU {} listed twice", id)));
            }
            continue;
        }

        if key == "HRU" {
            if values.len() != 6 {
                return Err(reader.error("HRU table header must name 6 columns"));
            }
            in_table = true;
            continue;
        }

        if seen_keys.contains(&key) {
            return Err(reader.error(format!("{} given twice", key)));
        }
        match key.as_str() {
            "BAND HEIGHT" => {
                band_height = Some(reader.number(&key, reader.single(&key, &values)?)?)
            }
            "MAX DENSITY" => {
                snow.max_density = reader.number(&key, reader.single(&key, &values)?)?
            }
            "COMPACTION" => snow.compaction = reader.number(&key, reader.single(&key, &values)?)?,
            "ALBEDO THRESHOLD" => {
                snow.albedo_threshold = reader.number(&key, reader.single(&key, &values)?)?
            }
            "ALBEDO DECAY SOLID" => {
                snow.albedo_decay_solid = reader.number(&key, reader.single(&key, &values)?)?
            }
            "ALBEDO DECAY LIQUID" => {
                snow.albedo_decay_liquid = reader.number(&key, reader.single(&key, &values)?)?
            }
            "GROUND MELT" => {
                snow.ground_melt = reader.number(&key, reader.single(&key, &values)?)?
            }
            "ASSIMILATION MAX DELAY" => {
                snow.assimilation_max_delay = reader.number(&key, reader.single(&key, &values)?)?
            }
            "CONIFER INDICES" => {
                snow.conifer_indices = values
                    .iter()
                    .filter(|v| !v.is_empty())
                    .map(|v| reader.number(&key, v))
                    .collect::<SnowResult<_>>()?
            }
            "DECIDUOUS INDICES" => {
                snow.deciduous_indices = values
                    .iter()
                    .filter(|v| !v.is_empty())
                    .map(|v| reader.number(&key, v))
                    .collect::<SnowResult<_>>()?
            }
            _ => return Err(reader.error(format!("unknown key {}", key))),
        }
        seen_keys.push(key);
    }

    if !versioned {
        return Err(SnowError::config(file, "empty parameter file"));
    }
    snow.band_height =
        band_height.ok_or_else(|| SnowError::config(file, "BAND HEIGHT is required"))?;
    snow.validate().map_err(|e| SnowError::config(file, e.to_string()))?;
    log::debug!("{}: {} HRU parameter rows", file, hrus.len());

    Ok(ParameterFile { snow, hrus })
}

/// Read the parameter file at `path`.
pub fn load_parameters(path: &Path) -> SnowResult<ParameterFile> {
    let file = File::open(path).map_err(|e| SnowError::io(path, e))?;
    read_parameters(BufReader::new(file), &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basin::LandCover;

    const SAMPLE: &str = "\
SNOWBAND PARAMETERS;1
# global parameters
band height;150
MAX DENSITY;0.4
COMPACTION;0.02   # per day
GROUND MELT;0.00025
CONIFER INDICES;1;2
DECIDUOUS INDICES;3

HRU;CONIFER THRESHOLD;CONIFER RATE;DECIDUOUS THRESHOLD;DECIDUOUS RATE;OPEN THRESHOLD;OPEN RATE
1;-1.0;0.012;-0.5;0.014;0.0;0.016
7;0;0.01;0;0.01;0;0.01
";

    fn parse(text: &str) -> SnowResult<ParameterFile> {
        read_parameters(text.as_bytes(), "params.csv")
    }

    #[test]
    fn reads_globals_and_table() {
        let p = parse(SAMPLE).unwrap();
        assert_eq!(p.snow.band_height, 150.0);
        assert_eq!(p.snow.max_density, 0.4);
        assert_eq!(p.snow.compaction, 0.02);
        assert_eq!(p.snow.conifer_indices, vec![1, 2]);
        assert_eq!(p.snow.deciduous_indices, vec![3]);
        assert_eq!(p.snow.albedo_threshold, SnowParameters::default().albedo_threshold);
        assert_eq!(p.hrus.len(), 2);
        let h1 = p.hrus[&1];
        assert_eq!(h1.class(LandCover::Conifer).melt_threshold, -1.0);
        assert_eq!(h1.class(LandCover::Open).melt_rate, 0.016);
    }

    #[test]
    fn hru_parameters_in_slot_order() {
        let p = parse(SAMPLE).unwrap();
        let v = p.hru_parameters(&[7, 1]).unwrap();
        assert_eq!(v[0].class(LandCover::Open).melt_rate, 0.01);
        assert_eq!(v[1].class(LandCover::Open).melt_rate, 0.016);
        assert!(p.hru_parameters(&[3]).is_err());
    }

    #[test]
    fn band_height_is_required() {
        let text = SAMPLE.replace("band height;150\n", "");
        assert!(matches!(parse(&text), Err(SnowError::Config { .. })));
    }

    #[test]
    fn unknown_and_duplicate_keys_are_errors() {
        let unknown = SAMPLE.replace("MAX DENSITY", "MAXIMUM DENSITY");
        match parse(&unknown) {
            Err(SnowError::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected parse error, got {:?}", other),
        }
        let dup = SAMPLE.replace("COMPACTION;0.02", "COMPACTION;0.02\nCOMPACTION;0.03");
        assert!(parse(&dup).is_err());
    }

    #[test]
    fn bounds_are_checked() {
        let text = SAMPLE.replace("MAX DENSITY;0.4", "MAX DENSITY;4");
        assert!(matches!(parse(&text), Err(SnowError::Config { .. })));
        let text = SAMPLE.replace("7;0;0.01", "7;9;0.01");
        assert!(parse(&text).is_err());
    }

    #[test]
    fn malformed_rows_are_errors() {
        assert!(parse(&SAMPLE.replace("7;0;0.01;0;0.01;0;0.01", "7;0;0.01")).is_err());
        assert!(parse(&SAMPLE.replace("7;0;0.01;0;", "7;x;0.01;0;")).is_err());
        assert!(parse(&format!("{}1;0;0.01;0;0.01;0;0.01\n", SAMPLE)).is_err());
        assert!(parse("BAND HEIGHT;100\n").is_err());
        assert!(parse("SNOWBAND PARAMETERS;2\nBAND HEIGHT;100\n").is_err());
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load_parameters(&path).unwrap().hrus.len(), 2);
    }
}
