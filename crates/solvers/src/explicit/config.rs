use thiserror::Error;

/// Configuration for the explicit solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    error_threshold: f64,
}

/// Errors that can occur when validating an explicit solver config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("error_threshold must be finite and non-negative")]
    ErrorThreshold,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            error_threshold: 1e-12,
        }
    }
}

impl Config {
    /// Creates a new config with a validated threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is negative or non-finite.
    pub fn new(error_threshold: f64) -> Result<Self, ConfigError> {
        if !error_threshold.is_finite() || error_threshold < 0.0 {
            return Err(ConfigError::ErrorThreshold);
        }
        Ok(Self { error_threshold })
    }

    /// Returns the largest residual norm still considered satisfied.
    #[must_use]
    pub fn error_threshold(&self) -> f64 {
        self.error_threshold
    }
}
