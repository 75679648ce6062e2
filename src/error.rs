use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Every failure the library can report.  All of them propagate straight to
/// the caller.
#[derive(Debug, Error)]
pub enum NrError {
    /// Missing or empty directory, or a variable that was not discovered.
    #[error("not found: {0}")]
    NotFound(String),

    /// A level file that does not follow the BAM 1-D text layout.
    #[error("{}:{line}: {message}", .file.display())]
    Parse {
        file: PathBuf,
        /// 1-based line number, 0 when the problem concerns the whole file.
        line: usize,
        message: String,
    },

    /// No finite neighbouring values to base a correction on.
    #[error("regularisation failed: {0}")]
    Regularisation(String),

    /// Tolerance unmet within the iteration budget, or an unusable integrand.
    #[error("integration failed: {message} (value {value:e}, error estimate {abs_error:e})")]
    Integration {
        message: String,
        value: f64,
        abs_error: f64,
    },

    /// A coordinate that no AMR level covers.
    #[error("coordinate {x} is not covered by any level")]
    Gap { x: f64 },

    /// Invalid configuration file or values.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NrError {
    pub(crate) fn parse(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        NrError::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn integration(message: impl Into<String>, value: f64, abs_error: f64) -> Self {
        NrError::Integration {
            message: message.into(),
            value,
            abs_error,
        }
    }
}

pub type Result<T> = std::result::Result<T, NrError>;
