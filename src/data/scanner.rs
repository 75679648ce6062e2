use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::model::{LevelFile, Variable};
use crate::error::{NrError, Result};

// ---------------------------------------------------------------------------
// Directory scan
// ---------------------------------------------------------------------------

/// Discover every variable in `root` and group its level files.
///
/// BAM names its 1-D output `<variable>.x<suffix>`, e.g. `alpha.xl0`,
/// `bssn_gxx.xl3`.  The variable is everything before the first `.x`; the
/// level number is the run of digits at the end of the suffix.
pub fn scan_directory(root: &Path) -> Result<Vec<Variable>> {
    if !root.is_dir() {
        return Err(NrError::NotFound(format!(
            "data directory {} does not exist",
            root.display()
        )));
    }

    let mut grouped: BTreeMap<String, Vec<(Option<u32>, PathBuf)>> = BTreeMap::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        // Follows symlinks.
        if !entry.path().is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some((stem, suffix)) = split_level_name(name) else {
            continue;
        };
        grouped
            .entry(stem.to_string())
            .or_default()
            .push((level_number(suffix), entry.path()));
    }

    if grouped.is_empty() {
        return Err(NrError::NotFound(format!(
            "no level files matching '<variable>.x*' in {}",
            root.display()
        )));
    }

    let variables: Vec<Variable> = grouped
        .into_iter()
        .map(|(name, files)| Variable {
            levels: number_levels(files),
            name,
        })
        .collect();

    log::info!(
        "Discovered variables in {}: {:?}",
        root.display(),
        variables.iter().map(|v| v.name.as_str()).collect::<Vec<_>>()
    );
    Ok(variables)
}

/// Look up a discovered variable by name.
pub fn find_variable<'a>(variables: &'a [Variable], name: &str) -> Result<&'a Variable> {
    variables.iter().find(|v| v.name == name).ok_or_else(|| {
        NrError::NotFound(format!(
            "variable '{name}' (available: {})",
            variables
                .iter()
                .map(|v| v.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })
}

/// `"alpha.xl0"` → `("alpha", "l0")`.
fn split_level_name(file_name: &str) -> Option<(&str, &str)> {
    let idx = file_name.find(".x")?;
    let stem = &file_name[..idx];
    if stem.is_empty() {
        return None;
    }
    Some((stem, &file_name[idx + 2..]))
}

fn level_number(suffix: &str) -> Option<u32> {
    let digits_start = suffix
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    suffix[digits_start..].parse().ok()
}

/// Explicitly numbered files keep their number; the rest are numbered after
/// them in path order.
fn number_levels(mut files: Vec<(Option<u32>, PathBuf)>) -> Vec<LevelFile> {
    files.sort_by(|a, b| a.1.cmp(&b.1));
    let mut next = files
        .iter()
        .filter_map(|(n, _)| *n)
        .max()
        .map_or(0, |n| n + 1);

    let mut levels: Vec<LevelFile> = files
        .into_iter()
        .map(|(number, path)| {
            let number = number.unwrap_or_else(|| {
                let n = next;
                next += 1;
                n
            });
            LevelFile { number, path }
        })
        .collect();
    levels.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.path.cmp(&b.path)));
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_variable_and_suffix() {
        assert_eq!(split_level_name("alpha.xl0"), Some(("alpha", "l0")));
        assert_eq!(split_level_name("bssn_gxx.xl12"), Some(("bssn_gxx", "l12")));
        assert_eq!(split_level_name("notes.txt"), None);
        assert_eq!(split_level_name(".xl0"), None);
    }

    #[test]
    fn level_number_from_trailing_digits() {
        assert_eq!(level_number("l0"), Some(0));
        assert_eq!(level_number("l12"), Some(12));
        assert_eq!(level_number("7"), Some(7));
        assert_eq!(level_number("l"), None);
        assert_eq!(level_number(""), None);
    }

    #[test]
    fn unnumbered_files_come_after_numbered_ones() {
        let levels = number_levels(vec![
            (None, PathBuf::from("a.xz")),
            (Some(1), PathBuf::from("a.xl1")),
            (None, PathBuf::from("a.xy")),
            (Some(0), PathBuf::from("a.xl0")),
        ]);
        let got: Vec<(u32, &str)> = levels
            .iter()
            .map(|l| (l.number, l.path.to_str().unwrap()))
            .collect();
        assert_eq!(got, vec![(0, "a.xl0"), (1, "a.xl1"), (2, "a.xy"), (3, "a.xz")]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_level_files_are_discovered() {
        let store = tempfile::tempdir().unwrap();
        let run = tempfile::tempdir().unwrap();
        let target = store.path().join("alpha.xl0");
        std::fs::write(&target, "\"Time = 0\n0 1\n1 1\n").unwrap();
        std::os::unix::fs::symlink(&target, run.path().join("alpha.xl0")).unwrap();
        std::fs::create_dir(run.path().join("beta.xl0")).unwrap();

        let variables = scan_directory(run.path()).unwrap();
        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].name, "alpha");
        assert_eq!(variables[0].levels[0].path, run.path().join("alpha.xl0"));
    }

    #[test]
    fn missing_directory_is_not_found() {
        let err = scan_directory(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, NrError::NotFound(_)));
    }
}
