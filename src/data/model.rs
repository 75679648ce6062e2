use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use crate::error::{NrError, Result};

/// Relative slack (in units of a level's grid spacing) used when comparing
/// coordinates that were written as `x0 + i * h`.
pub const COORD_EPS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Coordinate – totally ordered f64
// ---------------------------------------------------------------------------

/// A spatial coordinate or output time with a total order, so it can key
/// `BTreeMap`s.  NaN never reaches this type; the loader rejects it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate(pub f64);

impl Eq for Coordinate {}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Raw level data
// ---------------------------------------------------------------------------

/// One `(coordinate, value)` line of a level file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub x: f64,
    /// May be non-finite: BAM writes `inf`/`nan` at punctures.
    pub value: f64,
}

/// All samples written for one output time, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlice {
    pub time: f64,
    pub samples: Vec<Sample>,
}

impl TimeSlice {
    /// `[min x, max x]` of the slice, `None` if it holds no samples.
    pub fn extent(&self) -> Option<Extent> {
        let mut it = self.samples.iter().map(|s| s.x);
        let first = it.next()?;
        let (lo, hi) = it.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));
        Some(Extent { lo, hi })
    }
}

/// Closed spatial interval covered by a level at one time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub lo: f64,
    pub hi: f64,
}

impl Extent {
    /// Containment with an absolute slack `eps` on both ends.
    pub fn contains(&self, x: f64, eps: f64) -> bool {
        x >= self.lo - eps && x <= self.hi + eps
    }
}

/// One AMR refinement level of one variable, as loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    /// BAM level number taken from the file name (`alpha.xl2` → 2).
    pub number: u32,
    /// Grid spacing; smaller means finer.
    pub spacing: f64,
    pub slices: Vec<TimeSlice>,
}

impl Level {
    pub fn times(&self) -> Vec<f64> {
        self.slices.iter().map(|s| s.time).collect()
    }

    /// The slice written at `time`, if any.
    pub fn slice_at(&self, time: f64) -> Option<&TimeSlice> {
        self.slices.iter().find(|s| s.time == time)
    }

    /// Coordinate-comparison slack for this level.
    pub fn eps(&self) -> f64 {
        COORD_EPS * self.spacing
    }
}

// ---------------------------------------------------------------------------
// Variable – discovered by the directory scan
// ---------------------------------------------------------------------------

/// Path of one level file together with its level number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelFile {
    pub number: u32,
    pub path: PathBuf,
}

/// A named physical quantity and the level files that hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    /// Sorted by level number.
    pub levels: Vec<LevelFile>,
}

// ---------------------------------------------------------------------------
// Merged output
// ---------------------------------------------------------------------------

/// A merged value plus the level number it was taken from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedSample {
    pub x: f64,
    pub value: f64,
    pub level: u32,
}

/// All merged samples for one output time.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSlice {
    pub time: f64,
    /// Strictly increasing in `x`.
    pub samples: Vec<MergedSample>,
    /// Disjoint, sorted intervals covered by at least one level.
    pub coverage: Vec<Extent>,
    /// Slack used for coordinate lookups (finest contributing spacing).
    pub eps: f64,
}

impl MergedSlice {
    pub fn coverage(&self) -> &[Extent] {
        &self.coverage
    }

    pub fn is_covered(&self, x: f64) -> bool {
        self.coverage.iter().any(|e| e.contains(x, self.eps))
    }

    /// Exact sample lookup; `None` for coordinates that are not sample points.
    pub fn sample_at(&self, x: f64) -> Option<&MergedSample> {
        let idx = self.samples.partition_point(|s| s.x < x - self.eps);
        self.samples
            .get(idx)
            .filter(|s| (s.x - x).abs() <= self.eps)
    }

    /// Linear interpolation between neighbouring merged samples.
    ///
    /// Fails with [`NrError::Gap`] outside the covered intervals and between
    /// two samples that straddle an uncovered hole.
    pub fn interpolate(&self, x: f64) -> Result<f64> {
        let Some(extent) = self.coverage.iter().find(|e| e.contains(x, self.eps)) else {
            return Err(NrError::Gap { x });
        };
        if let Some(s) = self.sample_at(x) {
            return Ok(s.value);
        }
        let idx = self.samples.partition_point(|s| s.x < x);
        if idx == 0 || idx == self.samples.len() {
            return Err(NrError::Gap { x });
        }
        let left = self.samples[idx - 1];
        let right = self.samples[idx];
        // Both neighbours must belong to the interval that covers x.
        if !extent.contains(left.x, self.eps) || !extent.contains(right.x, self.eps) {
            return Err(NrError::Gap { x });
        }
        let t = (x - left.x) / (right.x - left.x);
        Ok(left.value + t * (right.value - left.value))
    }

    pub fn xs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.x).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One variable with all its AMR levels combined, one slice per output time.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDataset {
    pub variable: String,
    /// Sorted by time.
    pub slices: Vec<MergedSlice>,
}

impl MergedDataset {
    pub fn times(&self) -> Vec<f64> {
        self.slices.iter().map(|s| s.time).collect()
    }

    pub fn slice_at(&self, time: f64) -> Option<&MergedSlice> {
        self.slices.iter().find(|s| s.time == time)
    }

    /// Total number of rows across all time slices.
    pub fn len(&self) -> usize {
        self.slices.iter().map(MergedSlice::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.iter().all(MergedSlice::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(points: &[(f64, f64)], coverage: Vec<Extent>) -> MergedSlice {
        MergedSlice {
            time: 0.0,
            samples: points
                .iter()
                .map(|&(x, value)| MergedSample { x, value, level: 0 })
                .collect(),
            coverage,
            eps: 1e-9,
        }
    }

    #[test]
    fn coordinate_order_is_total() {
        let mut v = vec![Coordinate(2.0), Coordinate(-1.0), Coordinate(0.5)];
        v.sort();
        assert_eq!(v, vec![Coordinate(-1.0), Coordinate(0.5), Coordinate(2.0)]);
    }

    #[test]
    fn extent_of_unsorted_slice() {
        let s = TimeSlice {
            time: 0.0,
            samples: vec![
                Sample { x: 3.0, value: 0.0 },
                Sample { x: -1.0, value: 0.0 },
                Sample { x: 2.0, value: 0.0 },
            ],
        };
        assert_eq!(s.extent(), Some(Extent { lo: -1.0, hi: 3.0 }));
    }

    #[test]
    fn interpolation_is_linear_inside_coverage() {
        let s = slice(&[(0.0, 0.0), (1.0, 2.0)], vec![Extent { lo: 0.0, hi: 1.0 }]);
        assert_eq!(s.interpolate(0.25).unwrap(), 0.5);
        assert_eq!(s.interpolate(1.0).unwrap(), 2.0);
    }

    #[test]
    fn interpolation_refuses_to_bridge_gaps() {
        let s = slice(
            &[(0.0, 1.0), (1.0, 1.0), (3.0, 1.0), (4.0, 1.0)],
            vec![Extent { lo: 0.0, hi: 1.0 }, Extent { lo: 3.0, hi: 4.0 }],
        );
        assert!(matches!(s.interpolate(2.0), Err(NrError::Gap { .. })));
        assert!(matches!(s.interpolate(5.0), Err(NrError::Gap { .. })));
        assert!(s.is_covered(3.5));
        assert!(!s.is_covered(2.0));
    }

    #[test]
    fn sample_lookup_tolerates_round_off() {
        let s = slice(&[(0.1 + 0.2, 7.0)], vec![Extent { lo: 0.3, hi: 0.3 }]);
        assert_eq!(s.sample_at(0.3).map(|m| m.value), Some(7.0));
        assert!(s.sample_at(0.31).is_none());
    }
}
