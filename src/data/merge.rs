use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::model::{Coordinate, Extent, Level, MergedDataset, MergedSample, MergedSlice};
use crate::error::{NrError, Result};

// ---------------------------------------------------------------------------
// AMR level merge
// ---------------------------------------------------------------------------

/// Combine all levels of one variable into a single table per output time.
///
/// Resolution decides everything: at each time the finest level covering a
/// coordinate supplies its value and coarser levels only fill the regions no
/// finer level covers.  The order of `levels` is irrelevant.
pub fn merge_levels(variable: &str, levels: Vec<Level>) -> Result<MergedDataset> {
    if levels.is_empty() {
        return Err(NrError::NotFound(format!("no levels to merge for '{variable}'")));
    }

    let levels = finest_first(levels);

    let times: BTreeSet<Coordinate> = levels
        .iter()
        .flat_map(|l| l.slices.iter().map(|s| Coordinate(s.time)))
        .collect();

    let slices: Vec<MergedSlice> = times
        .into_iter()
        .map(|t| merge_time(variable, &levels, t.0))
        .collect();

    log::info!(
        "Merged '{variable}': {} levels, {} time steps, {} rows",
        levels.len(),
        slices.len(),
        slices.iter().map(MergedSlice::len).sum::<usize>()
    );

    Ok(MergedDataset {
        variable: variable.to_string(),
        slices,
    })
}

/// Sort by spacing, finest first.  Equal spacings fall back to the level
/// number, highest first, then to the level contents, never to the listing
/// order.
fn finest_first(mut levels: Vec<Level>) -> Vec<Level> {
    levels.sort_by(|a, b| {
        a.spacing
            .total_cmp(&b.spacing)
            .then_with(|| b.number.cmp(&a.number))
            .then_with(|| content_cmp(a, b))
    });
    levels
}

/// Total order on the samples of two levels: time, coordinate, value.
fn content_cmp(a: &Level, b: &Level) -> Ordering {
    let keys = |l: &Level| {
        l.slices
            .iter()
            .flat_map(|s| s.samples.iter().map(move |p| (s.time, p.x, p.value)))
            .collect::<Vec<_>>()
    };
    let (ka, kb) = (keys(a), keys(b));
    ka.iter()
        .zip(&kb)
        .map(|(x, y)| {
            x.0.total_cmp(&y.0)
                .then_with(|| x.1.total_cmp(&y.1))
                .then_with(|| x.2.total_cmp(&y.2))
        })
        .find(|o| o.is_ne())
        .unwrap_or_else(|| ka.len().cmp(&kb.len()))
}

fn merge_time(variable: &str, levels: &[Level], time: f64) -> MergedSlice {
    // Extents (with slack) of the levels already visited, i.e. the finer ones.
    let mut finer: Vec<(Extent, f64)> = Vec::new();
    let mut samples: Vec<MergedSample> = Vec::new();

    for level in levels {
        let Some(slice) = level.slice_at(time) else {
            continue;
        };
        let Some(extent) = slice.extent() else {
            continue;
        };

        let before = samples.len();
        samples.extend(
            slice
                .samples
                .iter()
                .filter(|s| !finer.iter().any(|(e, eps)| e.contains(s.x, *eps)))
                .map(|s| MergedSample {
                    x: s.x,
                    value: s.value,
                    level: level.number,
                }),
        );
        log::debug!(
            "'{variable}' t = {time}: level {} (h = {:e}) contributes {} of {} samples",
            level.number,
            level.spacing,
            samples.len() - before,
            slice.samples.len()
        );

        finer.push((extent, level.eps()));
    }

    samples.sort_by(|a, b| a.x.total_cmp(&b.x));
    // A level may list a coordinate twice; keep its first occurrence.
    samples.dedup_by(|later, earlier| later.x == earlier.x);

    let eps = levels
        .iter()
        .filter(|l| l.slice_at(time).is_some())
        .map(Level::eps)
        .next()
        .unwrap_or(0.0);

    MergedSlice {
        time,
        samples,
        coverage: union(finer.into_iter().map(|(e, _)| e).collect(), eps),
        eps,
    }
}

/// Merge overlapping extents into sorted, disjoint intervals.
fn union(mut extents: Vec<Extent>, eps: f64) -> Vec<Extent> {
    extents.sort_by(|a, b| a.lo.total_cmp(&b.lo));
    let mut out: Vec<Extent> = Vec::with_capacity(extents.len());
    for e in extents {
        match out.last_mut() {
            Some(last) if e.lo <= last.hi + eps => last.hi = last.hi.max(e.hi),
            _ => out.push(e),
        }
    }
    out
}
