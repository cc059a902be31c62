//! Error types shared by the library modules
//!
//! Structural problems (an empty lap table, a negative margin) are
//! configuration errors; anything wrong with the values in the input files
//! is a data error.

use thiserror::Error;

/// Errors raised by lap alignment and the analysis steps built on it
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for lapsync operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub(crate) fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// True for errors caused by the input values rather than the setup
    pub fn is_data(&self) -> bool {
        matches!(self, Error::Data(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(
            Error::config("no laps").to_string(),
            "Configuration error: no laps"
        );
        assert_eq!(Error::data("bad row").to_string(), "Data error: bad row");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_data());
    }
}
