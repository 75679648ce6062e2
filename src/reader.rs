use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::data::loader::load_levels;
use crate::data::merge::merge_levels;
use crate::data::model::{MergedDataset, Variable};
use crate::data::scanner::{find_variable, scan_directory};
use crate::error::{NrError, Result};

// ---------------------------------------------------------------------------
// Reader: scan → load → merge for a whole output directory
// ---------------------------------------------------------------------------

/// Everything found in one BAM output directory.
pub struct NrDataReader {
    data_dir: PathBuf,
    /// Discovered on the first scan.
    variables: Vec<Variable>,
    /// Merged datasets, keyed by variable name.
    data: BTreeMap<String, MergedDataset>,
}

impl NrDataReader {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        if !data_dir.is_dir() {
            return Err(NrError::NotFound(format!(
                "data directory not found at {}",
                data_dir.display()
            )));
        }
        Ok(Self {
            data_dir,
            variables: Vec::new(),
            data: BTreeMap::new(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn scan(&mut self) -> Result<()> {
        if self.variables.is_empty() {
            log::info!("Scanning {}", self.data_dir.display());
            self.variables = scan_directory(&self.data_dir)?;
        }
        Ok(())
    }

    /// Load and merge every discovered variable.
    pub fn load(&mut self) -> Result<()> {
        self.scan()?;
        let names: Vec<String> = self.variables.iter().map(|v| v.name.clone()).collect();
        for name in names {
            self.load_variable(&name)?;
        }
        log::info!("Data loading complete: {} variables", self.data.len());
        Ok(())
    }

    /// Load and merge a single variable (cached after the first call).
    pub fn load_variable(&mut self, name: &str) -> Result<&MergedDataset> {
        self.scan()?;
        if !self.data.contains_key(name) {
            log::info!("Processing variable: {name}");
            let variable = find_variable(&self.variables, name)?;
            let levels = load_levels(&variable.levels)?;
            let merged = merge_levels(name, levels)?;
            self.data.insert(name.to_string(), merged);
        }
        self.variable(name)
    }

    /// Names of the discovered variables, sorted.
    pub fn variables(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// A merged dataset that has already been loaded.
    pub fn variable(&self, name: &str) -> Result<&MergedDataset> {
        self.data
            .get(name)
            .ok_or_else(|| NrError::NotFound(format!("variable '{name}' has not been loaded")))
    }

    /// Output times of the first loaded variable in name order.
    pub fn times(&self) -> Vec<f64> {
        self.data
            .values()
            .next()
            .map(MergedDataset::times)
            .unwrap_or_default()
    }

    pub fn datasets(&self) -> impl Iterator<Item = &MergedDataset> {
        self.data.values()
    }
}
