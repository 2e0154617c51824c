//! Run configuration, immutable for the duration of a run.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("iterations must be > 0")]
    ZeroIterations,

    #[error("matrix_size must be > 0")]
    ZeroMatrixSize,

    #[error("inflation_parameter must be >= 1, got {0}")]
    InflationTooSmall(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KMeansOptions {
    pub iterations: usize,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self { iterations: 50 }
    }
}

impl KMeansOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MclOptions {
    pub iterations: usize,
    /// `n` of the `n x n` matrix; bounds the expand fan-out.
    pub matrix_size: u32,
    /// Exponent applied by the inflate stage.
    pub inflation_parameter: u32,
}

impl Default for MclOptions {
    fn default() -> Self {
        Self {
            iterations: 10,
            matrix_size: 12,
            inflation_parameter: 2,
        }
    }
}

impl MclOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.matrix_size == 0 {
            return Err(ConfigError::ZeroMatrixSize);
        }
        if self.inflation_parameter < 1 {
            return Err(ConfigError::InflationTooSmall(self.inflation_parameter));
        }
        Ok(())
    }
}
