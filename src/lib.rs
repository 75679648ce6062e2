//! Reader for BAM numerical-relativity 1-D output.
//!
//! Scans a directory of `<variable>.x*` level files, merges the AMR levels of
//! each variable so the finest resolution wins everywhere, regularises values
//! near singular points and integrates derived quantities such as proper
//! distance.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod reader;

pub use analysis::integrate::{IntegrationResult, Integrator};
pub use analysis::regularise::{RegularisationPolicy, Regulariser};
pub use config::{ReaderConfig, Tolerance};
pub use data::model::{Level, MergedDataset, MergedSample, MergedSlice, Variable};
pub use error::{NrError, Result};
pub use reader::NrDataReader;
