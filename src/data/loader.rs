use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::model::{Level, LevelFile, Sample, TimeSlice};
use crate::error::{NrError, Result};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load one level file from disk.
pub fn load_level(path: &Path, number: u32) -> Result<Level> {
    let file = File::open(path)?;
    parse_level(BufReader::new(file), number, path)
}

/// Load every level file of a variable.
pub fn load_levels(files: &[LevelFile]) -> Result<Vec<Level>> {
    files
        .iter()
        .map(|f| {
            let level = load_level(&f.path, f.number)?;
            log::info!(
                "  - Loaded level {} ({}), spacing {:e}, {} time steps",
                level.number,
                f.path.display(),
                level.spacing,
                level.slices.len()
            );
            Ok(level)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// BAM 1-D text parser
// ---------------------------------------------------------------------------

/// Parse the BAM 1-D text layout:
///
/// ```text
/// "Time = 0.000000e+00
/// -4.000000e+00 1.000000e+00
/// -3.000000e+00 9.523810e-01
///
/// "Time = 5.000000e-01
/// ...
/// ```
///
/// Lines starting with `"` are comments; a comment mentioning `Time` opens a
/// new block.  Data lines are `coordinate value`.  Sample order is kept
/// exactly as written.
pub fn parse_level<R: BufRead>(mut reader: R, number: u32, source: &Path) -> Result<Level> {
    let mut slices: Vec<TimeSlice> = Vec::new();
    let mut buf: Vec<u8> = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = std::str::from_utf8(&buf)
            .map_err(|_| NrError::parse(source, line_no, "invalid UTF-8"))?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if let Some(comment) = trimmed.strip_prefix('"') {
            if comment.contains("Time") {
                let time = parse_time(comment)
                    .ok_or_else(|| NrError::parse(source, line_no, format!("bad time header: {trimmed}")))?;
                slices.push(TimeSlice {
                    time,
                    samples: Vec::new(),
                });
            }
            continue;
        }

        let sample = parse_sample(trimmed).map_err(|msg| NrError::parse(source, line_no, msg))?;
        match slices.last_mut() {
            Some(slice) => slice.samples.push(sample),
            None => {
                return Err(NrError::parse(
                    source,
                    line_no,
                    "data line before the first time header",
                ))
            }
        }
    }

    if slices.is_empty() {
        return Err(NrError::parse(source, 0, "no time blocks found"));
    }

    drop_incomplete_tail(&mut slices, source);

    let spacing = grid_spacing(&slices[0]).ok_or_else(|| {
        NrError::parse(
            source,
            0,
            "cannot determine grid spacing: first time block has fewer than two distinct coordinates",
        )
    })?;

    Ok(Level {
        number,
        spacing,
        slices,
    })
}

/// `" Time = 0.5"` / `"Time = 5.000000e-01"` → `0.5`.
fn parse_time(comment: &str) -> Option<f64> {
    let (_, rhs) = comment.split_once('=')?;
    rhs.trim()
        .trim_matches('"')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite())
}

fn parse_sample(line: &str) -> std::result::Result<Sample, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(format!("expected 2 columns, found {}", fields.len()));
    }
    let x = parse_float(fields[0])?;
    let value = parse_float(fields[1])?;
    if !x.is_finite() {
        return Err(format!("non-finite coordinate '{}'", fields[0]));
    }
    Ok(Sample { x, value })
}

fn parse_float(tok: &str) -> std::result::Result<f64, String> {
    tok.parse::<f64>()
        .map_err(|_| format!("'{tok}' is not a number"))
}

/// A final block shorter than the first one was still being written when the
/// output was copied; keep only whole blocks.
fn drop_incomplete_tail(slices: &mut Vec<TimeSlice>, source: &Path) {
    if slices.len() < 2 {
        return;
    }
    let expected = slices[0].samples.len();
    if let Some(last) = slices.last() {
        if last.samples.len() < expected {
            log::warn!(
                "{}: dropping incomplete block at t = {} ({} of {} rows)",
                source.display(),
                last.time,
                last.samples.len(),
                expected
            );
            slices.pop();
        }
    }
}

/// Smallest positive gap between consecutive coordinates.
fn grid_spacing(slice: &TimeSlice) -> Option<f64> {
    slice
        .samples
        .windows(2)
        .map(|w| (w[1].x - w[0].x).abs())
        .filter(|d| *d > 0.0)
        .min_by(|a, b| a.total_cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Level> {
        parse_level(text.as_bytes(), 0, Path::new("test.xl0"))
    }

    #[test]
    fn parses_blocks_and_spacing() {
        let level = parse(
            "\"Time = 0.000000e+00\n0.0 1.0\n0.5 2.0\n1.0 3.0\n\n\"Time = 0.25\"\n0.0 4.0\n0.5 5.0\n1.0 6.0\n",
        )
        .unwrap();
        assert_eq!(level.times(), vec![0.0, 0.25]);
        assert_eq!(level.spacing, 0.5);
        assert_eq!(level.slices[1].samples[2], Sample { x: 1.0, value: 6.0 });
    }

    #[test]
    fn keeps_native_order() {
        let level = parse("\"Time = 0\n2.0 0.0\n1.0 0.0\n0.0 0.0\n").unwrap();
        let xs: Vec<f64> = level.slices[0].samples.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![2.0, 1.0, 0.0]);
        assert_eq!(level.spacing, 1.0);
    }

    #[test]
    fn ignores_other_comments() {
        let level = parse("\"x alpha\n\"Time = 1\n0 1\n1 1\n").unwrap();
        assert_eq!(level.times(), vec![1.0]);
    }

    #[test]
    fn accepts_non_finite_values() {
        let level = parse("\"Time = 0\n0.0 inf\n1.0 NaN\n").unwrap();
        assert!(level.slices[0].samples[0].value.is_infinite());
        assert!(level.slices[0].samples[1].value.is_nan());
    }

    #[test]
    fn drops_truncated_last_block() {
        let level = parse("\"Time = 0\n0 1\n1 1\n2 1\n\"Time = 1\n0 1\n1 1\n").unwrap();
        assert_eq!(level.times(), vec![0.0]);
    }

    #[test]
    fn rejects_malformed_lines() {
        let err = parse("\"Time = 0\n0.0 1.0 2.0\n").unwrap_err();
        match err {
            NrError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(parse("\"Time = 0\n0.0 abc\n"), Err(NrError::Parse { .. })));
        assert!(matches!(parse("\"Time = 0\nnan 1.0\n1 1\n"), Err(NrError::Parse { .. })));
        assert!(matches!(parse("\"Time = soon\n0 1\n"), Err(NrError::Parse { .. })));
    }

    #[test]
    fn rejects_non_finite_times() {
        for header in ["\"Time = nan", "\"Time = inf", "\"Time = -inf\""] {
            let text = format!("{header}\n0 1\n1 2\n");
            assert!(
                matches!(parse(&text), Err(NrError::Parse { line: 1, .. })),
                "{header}"
            );
        }
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let bytes: &[u8] = b"\"Time = 0\n0.0 1.0\n\xff\xfe 2.0\n";
        match parse_level(bytes, 0, Path::new("alpha.xl0")) {
            Err(NrError::Parse { line, message, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(message, "invalid UTF-8");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_data_before_header_and_empty_files() {
        assert!(matches!(parse("0 1\n\"Time = 0\n"), Err(NrError::Parse { line: 1, .. })));
        assert!(matches!(parse(""), Err(NrError::Parse { line: 0, .. })));
        assert!(matches!(parse("\"Time = 0\n1 1\n"), Err(NrError::Parse { .. })));
    }
}
