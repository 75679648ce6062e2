#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::Path;

use nr_reader::data::model::{Level, Sample, TimeSlice};

/// Coordinates `lo, lo + h, ..., hi`.
pub fn grid(lo: f64, hi: f64, h: f64) -> Vec<f64> {
    let n = ((hi - lo) / h).round() as usize;
    (0..=n).map(|i| lo + i as f64 * h).collect()
}

/// BAM 1-D text for the given blocks.
pub fn bam_text(blocks: &[(f64, Vec<(f64, f64)>)]) -> String {
    let mut out = String::new();
    for (time, rows) in blocks {
        writeln!(out, "\"Time = {time:.6e}").unwrap();
        for (x, v) in rows {
            writeln!(out, "{x:.16e} {v:.16e}").unwrap();
        }
        writeln!(out).unwrap();
    }
    out
}

/// Write `<dir>/<name>.xl<level>` sampling `f` on a uniform grid at each time.
pub fn write_level(
    dir: &Path,
    name: &str,
    level: u32,
    (lo, hi, h): (f64, f64, f64),
    times: &[f64],
    f: impl Fn(f64, f64) -> f64,
) {
    let blocks: Vec<(f64, Vec<(f64, f64)>)> = times
        .iter()
        .map(|&t| (t, grid(lo, hi, h).into_iter().map(|x| (x, f(x, t))).collect()))
        .collect();
    std::fs::write(dir.join(format!("{name}.xl{level}")), bam_text(&blocks))
        .expect("write level file");
}

/// In-memory level with a constant tag value, so merged samples reveal their source.
pub fn tagged_level(number: u32, lo: f64, hi: f64, h: f64, tag: f64) -> Level {
    Level {
        number,
        spacing: h,
        slices: vec![TimeSlice {
            time: 0.0,
            samples: grid(lo, hi, h)
                .into_iter()
                .map(|x| Sample { x, value: tag })
                .collect(),
        }],
    }
}
