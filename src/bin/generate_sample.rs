use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use nr_reader::config::ProperDistanceConfig;
use nr_reader::{ReaderConfig, RegularisationPolicy};

/// Puncture mass.
const MASS: f64 = 1.0;

/// (level, half-width, spacing) – nested boxes centred on the puncture.
const LEVELS: [(u32, f64, f64); 3] = [(0, 16.0, 1.0), (1, 8.0, 0.5), (2, 4.0, 0.25)];

const TIMES: [f64; 3] = [0.0, 0.25, 0.5];

/// Conformal factor of a Schwarzschild puncture in isotropic coordinates.
fn psi(r: f64) -> f64 {
    1.0 + MASS / (2.0 * r.abs())
}

/// Pre-collapsed lapse, slowly collapsing further in time.
fn alpha(r: f64, t: f64) -> f64 {
    let p = psi(r);
    (-t).exp() / (p * p)
}

fn grr(r: f64, _t: f64) -> f64 {
    psi(r).powi(4)
}

fn write_level(
    path: &Path,
    half_width: f64,
    spacing: f64,
    f: impl Fn(f64, f64) -> f64,
) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let n = (2.0 * half_width / spacing).round() as usize;

    for (k, &t) in TIMES.iter().enumerate() {
        writeln!(out, "\"Time = {t:.6e}")?;
        // The last block stops half way, as if the run were still going.
        let rows = if k + 1 == TIMES.len() { n / 2 } else { n + 1 };
        for i in 0..rows {
            let x = -half_width + i as f64 * spacing;
            writeln!(out, "{x:.6e} {:.16e}", f(x, t))?;
        }
        writeln!(out)?;
    }
    out.flush()
}

fn main() {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_bam"));
    std::fs::create_dir_all(&dir).expect("Failed to create output directory");

    let fields: [(&str, fn(f64, f64) -> f64); 2] = [("alpha", alpha), ("grr", grr)];
    for (name, f) in fields {
        for (level, half_width, spacing) in LEVELS {
            let path = dir.join(format!("{name}.xl{level}"));
            write_level(&path, half_width, spacing, f).expect("Failed to write level file");
        }
    }

    let mut config = ReaderConfig::new(&dir);
    config.regularisation_policy = RegularisationPolicy::Extrapolate;
    config.regularisation_radius = 0.3;
    config.output_dir = dir.join("merged");
    config.proper_distance = Some(ProperDistanceConfig {
        variable: "grr".into(),
        lower: 0.5,
        upper: 4.0,
    });
    let config_path = dir.join("nr-reader.json");
    let json = serde_json::to_string_pretty(&config).expect("Failed to serialise config");
    std::fs::write(&config_path, json).expect("Failed to write config");

    println!(
        "Wrote {} variables x {} levels to {} (config: {})",
        fields.len(),
        LEVELS.len(),
        dir.display(),
        config_path.display()
    );
}
