//! Error types shared by the alert overlay crates.

use thiserror::Error;

/// Result type alias using AlertError.
pub type AlertResult<T> = Result<T, AlertError>;

/// Primary error type for grid, extent and configuration problems.
///
/// Per-tile failures (transport, image decode) never reach this type; they
/// are recorded on the tile and dropped by the overlay.
#[derive(Debug, Error)]
pub enum AlertError {
    // === Grid / Coordinate Errors ===
    #[error("Invalid tile grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid extent: {0}")]
    InvalidExtent(String),

    // === Date Errors ===
    #[error("Invalid date value: {0}")]
    InvalidDate(String),

    #[error("Date range is inverted: min {min} > max {max}")]
    InvertedDateRange { min: u32, max: u32 },

    // === Configuration Errors ===
    #[error("Invalid configuration value for '{key}': {message}")]
    Config { key: String, message: String },

    #[error("Failed to read configuration: {0}")]
    ConfigRead(String),
}

impl AlertError {
    /// Shorthand for a configuration error on a named key.
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        AlertError::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether this error was caused by caller-supplied input rather than I/O.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, AlertError::ConfigRead(_))
    }
}

impl From<std::io::Error> for AlertError {
    fn from(err: std::io::Error) -> Self {
        AlertError::ConfigRead(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = AlertError::config("tile_url", "missing {z} placeholder");
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for 'tile_url': missing {z} placeholder"
        );
        assert!(err.is_input_error());
    }

    #[test]
    fn test_io_error_is_not_input_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "overlay.yaml");
        let err: AlertError = io.into();
        assert!(!err.is_input_error());
    }
}
