//! Error taxonomy for the snow band engine.
//!
//! Configuration and state errors are fatal and raised before or at load
//! time. Numeric guards inside the step path never produce an error.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type SnowResult<T> = Result<T, SnowError>;

#[derive(Error, Debug)]
pub enum SnowError {
    /// Invalid parameter value or inconsistent configuration.
    #[error("configuration error in {file}: {message}")]
    Config { file: String, message: String },

    /// Malformed line in a parameter file.
    #[error("parse error in {file}:{line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    /// Raster origin, resolution or extent mismatch.
    #[error("raster error: {0}")]
    Raster(String),

    /// Checkpoint file does not match the simulated basin.
    #[error("state file {file}: {message}")]
    State { file: String, message: String },

    /// Forcing record rejected for the current step.
    #[error("forcing error: {0}")]
    Forcing(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SnowError {
    pub fn config(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn parse(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn state(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::State {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_file_and_line() {
        let e = SnowError::parse("params.csv", 7, "expected a number");
        let msg = e.to_string();
        assert!(msg.contains("params.csv:7"));
        assert!(msg.contains("expected a number"));
    }

    #[test]
    fn io_error_keeps_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e = SnowError::io("state.csv", inner);
        assert!(std::error::Error::source(&e).is_some());
        assert!(e.to_string().contains("state.csv"));
    }
}
