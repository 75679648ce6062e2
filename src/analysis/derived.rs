use super::integrate::{IntegrationResult, Integrator};
use super::regularise::Regulariser;
use crate::data::model::{MergedDataset, MergedSlice};
use crate::error::{NrError, Result};

// ---------------------------------------------------------------------------
// Integrals of merged data
// ---------------------------------------------------------------------------

/// `[a, b]` must sit inside one covered interval; otherwise report where the
/// first hole starts.
fn check_coverage(slice: &MergedSlice, a: f64, b: f64) -> Result<()> {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let extent = slice
        .coverage()
        .iter()
        .find(|e| e.contains(lo, slice.eps))
        .ok_or(NrError::Gap { x: lo })?;
    if extent.contains(hi, slice.eps) {
        Ok(())
    } else {
        Err(NrError::Gap { x: extent.hi })
    }
}

fn integrate_interpolated(
    slice: &MergedSlice,
    a: f64,
    b: f64,
    integrator: &Integrator,
    transform: impl Fn(f64) -> f64,
) -> Result<IntegrationResult> {
    check_coverage(slice, a, b)?;
    let breakpoints = slice.xs();
    integrator.integrate_with_breakpoints(
        |x| slice.interpolate(x).map_or(f64::NAN, &transform),
        a,
        b,
        &breakpoints,
    )
}

/// Integral of the linearly interpolated slice over `[a, b]`.
pub fn integrate_slice(
    slice: &MergedSlice,
    a: f64,
    b: f64,
    integrator: &Integrator,
) -> Result<IntegrationResult> {
    integrate_interpolated(slice, a, b, integrator, |v| v)
}

/// Proper distance `∫ sqrt(g_xx) dx` along the grid line between `a` and `b`.
///
/// With a regulariser, the slice is first regularised around `singularity`.
pub fn proper_distance(
    g_xx: &MergedSlice,
    a: f64,
    b: f64,
    regulariser: Option<(&Regulariser, f64)>,
    integrator: &Integrator,
) -> Result<IntegrationResult> {
    let regularised;
    let slice = match regulariser {
        Some((reg, singularity)) => {
            regularised = reg.apply(g_xx, singularity)?;
            &regularised
        }
        None => g_xx,
    };
    integrate_interpolated(slice, a, b, integrator, |g| {
        if g >= 0.0 {
            g.sqrt()
        } else {
            f64::NAN
        }
    })
}

/// Proper distance at every output time of a dataset.
pub fn proper_distance_series(
    g_xx: &MergedDataset,
    a: f64,
    b: f64,
    regulariser: Option<(&Regulariser, f64)>,
    integrator: &Integrator,
) -> Result<Vec<(f64, IntegrationResult)>> {
    g_xx.slices
        .iter()
        .map(|slice| {
            let result = proper_distance(slice, a, b, regulariser, integrator)?;
            log::info!(
                "proper distance of '{}' on [{a}, {b}] at t = {}: {:.10e} ± {:.1e}",
                g_xx.variable,
                slice.time,
                result.value,
                result.abs_error
            );
            Ok((slice.time, result))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::regularise::RegularisationPolicy;
    use crate::config::Tolerance;
    use crate::data::model::{Extent, MergedSample};

    fn integrator() -> Integrator {
        Integrator::new(
            Tolerance {
                abs_tol: 1e-10,
                rel_tol: 0.0,
            },
            100,
        )
    }

    fn slice_of(f: impl Fn(f64) -> f64, lo: f64, hi: f64, h: f64) -> MergedSlice {
        let n = ((hi - lo) / h).round() as usize;
        MergedSlice {
            time: 0.0,
            samples: (0..=n)
                .map(|i| {
                    let x = lo + i as f64 * h;
                    MergedSample { x, value: f(x), level: 0 }
                })
                .collect(),
            coverage: vec![Extent { lo, hi }],
            eps: 1e-9 * h,
        }
    }

    #[test]
    fn flat_metric_gives_coordinate_distance() {
        let slice = slice_of(|_| 1.0, 0.0, 5.0, 0.5);
        let r = proper_distance(&slice, 1.0, 4.0, None, &integrator()).unwrap();
        assert!((r.value - 3.0).abs() < 1e-10);
    }

    #[test]
    fn piecewise_linear_integral_is_exact() {
        let slice = slice_of(|x| 2.0 * x, 0.0, 2.0, 0.25);
        let r = integrate_slice(&slice, 0.0, 2.0, &integrator()).unwrap();
        assert!((r.value - 4.0).abs() < 1e-10);
    }

    #[test]
    fn outside_coverage_is_a_gap() {
        let slice = slice_of(|_| 1.0, 0.0, 1.0, 0.5);
        assert!(matches!(
            integrate_slice(&slice, 0.0, 2.0, &integrator()),
            Err(NrError::Gap { x }) if x == 1.0
        ));
        assert!(matches!(
            integrate_slice(&slice, -1.0, 0.5, &integrator()),
            Err(NrError::Gap { .. })
        ));
    }

    #[test]
    fn singular_metric_needs_regularising() {
        let psi4 = |r: f64| (1.0 + 0.5 / r.abs()).powi(4);
        let slice = slice_of(psi4, 0.0, 2.0, 0.05);
        assert!(matches!(
            proper_distance(&slice, 0.0, 1.0, None, &integrator()),
            Err(NrError::Integration { .. })
        ));

        let reg = Regulariser::new(RegularisationPolicy::Clip, 0.2);
        let r = proper_distance(&slice, 0.0, 1.0, Some((&reg, 0.0)), &integrator()).unwrap();
        assert!(r.value.is_finite() && r.value > 1.0);
    }

    #[test]
    fn negative_metric_is_rejected() {
        let slice = slice_of(|x| x - 1.0, 0.0, 2.0, 0.5);
        assert!(matches!(
            proper_distance(&slice, 0.0, 2.0, None, &integrator()),
            Err(NrError::Integration { .. })
        ));
    }
}
