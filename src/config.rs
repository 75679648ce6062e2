use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::regularise::RegularisationPolicy;
use crate::error::{NrError, Result};

// ---------------------------------------------------------------------------
// Reader configuration (JSON file)
// ---------------------------------------------------------------------------

/// Absolute / relative error targets for adaptive quadrature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub abs_tol: f64,
    pub rel_tol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            abs_tol: 1e-10,
            rel_tol: 1e-8,
        }
    }
}

/// Which variable to integrate for proper distance, and over which interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProperDistanceConfig {
    /// Name of the metric component, e.g. `grr` or `bssn_gxx`.
    pub variable: String,
    pub lower: f64,
    pub upper: f64,
}

/// Everything the pipeline can be told.
///
/// ```json
/// {
///   "grid_root": "runs/puncture",
///   "regularisation_radius": 0.1,
///   "regularisation_policy": "floor",
///   "floor_value": 100.0,
///   "integration_tolerance": { "abs_tol": 1e-10, "rel_tol": 1e-8 },
///   "max_iterations": 200
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReaderConfig {
    /// Directory holding the `<variable>.x*` level files.
    pub grid_root: PathBuf,

    /// Half-width of the neighbourhood around the singularity.
    #[serde(default = "default_radius")]
    pub regularisation_radius: f64,

    #[serde(default)]
    pub regularisation_policy: RegularisationPolicy,

    /// Replacement value for the `floor` policy.
    #[serde(default)]
    pub floor_value: Option<f64>,

    /// Polynomial degree for the `extrapolate` policy.
    #[serde(default = "default_extrapolation_order")]
    pub extrapolation_order: usize,

    /// Coordinate of the singularity (the puncture sits at the origin).
    #[serde(default)]
    pub singularity: f64,

    #[serde(default)]
    pub integration_tolerance: Tolerance,

    /// Bisection budget for adaptive integration.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub export_parquet: bool,

    #[serde(default)]
    pub proper_distance: Option<ProperDistanceConfig>,
}

fn default_radius() -> f64 {
    0.1
}

fn default_extrapolation_order() -> usize {
    2
}

fn default_max_iterations() -> usize {
    200
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("merged")
}

impl ReaderConfig {
    /// Configuration with defaults for everything except the grid root.
    pub fn new(grid_root: impl Into<PathBuf>) -> Self {
        Self {
            grid_root: grid_root.into(),
            regularisation_radius: default_radius(),
            regularisation_policy: RegularisationPolicy::default(),
            floor_value: None,
            extrapolation_order: default_extrapolation_order(),
            singularity: 0.0,
            integration_tolerance: Tolerance::default(),
            max_iterations: default_max_iterations(),
            output_dir: default_output_dir(),
            export_parquet: false,
            proper_distance: None,
        }
    }

    /// Read and validate a JSON configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ReaderConfig =
            serde_json::from_str(text).map_err(|e| NrError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.regularisation_radius.is_finite() && self.regularisation_radius > 0.0) {
            return Err(NrError::Config(format!(
                "regularisation_radius must be a positive number, got {}",
                self.regularisation_radius
            )));
        }
        if !self.singularity.is_finite() {
            return Err(NrError::Config("singularity must be finite".into()));
        }
        match (self.regularisation_policy, self.floor_value) {
            (RegularisationPolicy::Floor, None) => {
                return Err(NrError::Config(
                    "regularisation_policy \"floor\" needs a floor_value".into(),
                ));
            }
            (_, Some(v)) if !v.is_finite() => {
                return Err(NrError::Config(format!("floor_value must be finite, got {v}")));
            }
            _ => {}
        }
        if self.extrapolation_order == 0 {
            return Err(NrError::Config("extrapolation_order must be at least 1".into()));
        }
        let tol = self.integration_tolerance;
        if !(tol.abs_tol >= 0.0 && tol.rel_tol >= 0.0) || (tol.abs_tol == 0.0 && tol.rel_tol == 0.0) {
            return Err(NrError::Config(format!(
                "integration_tolerance needs non-negative abs_tol/rel_tol, not both zero (got {} / {})",
                tol.abs_tol, tol.rel_tol
            )));
        }
        if let Some(pd) = &self.proper_distance {
            if !(pd.lower.is_finite() && pd.upper.is_finite()) {
                return Err(NrError::Config("proper_distance bounds must be finite".into()));
            }
        }
        Ok(())
    }
}
