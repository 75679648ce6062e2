use crate::config::{ReaderConfig, Tolerance};
use crate::error::{NrError, Result};

// ---------------------------------------------------------------------------
// 7-point Gauss / 15-point Kronrod rule
// ---------------------------------------------------------------------------

/// Kronrod abscissae on [-1, 1]; odd indices are the Gauss nodes.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_639_206_854_697_526_329,
    0.949_107_912_342_758_524_526_189_684_047_851,
    0.864_864_423_359_769_072_789_712_788_640_926,
    0.741_531_185_599_394_439_863_864_773_280_788,
    0.586_087_235_467_691_130_294_144_845_693_013,
    0.405_845_151_377_397_166_906_606_412_076_961,
    0.207_784_955_007_898_467_600_689_403_773_245,
    0.0,
];

const WGK: [f64; 8] = [
    0.022_935_322_010_529_224_963_732_008_058_970,
    0.063_092_092_629_978_553_290_700_663_189_204,
    0.104_790_010_322_250_183_839_876_322_541_518,
    0.140_653_259_715_525_918_745_189_590_510_238,
    0.169_004_726_639_267_902_826_583_426_598_550,
    0.190_350_578_064_785_409_913_256_402_421_014,
    0.204_432_940_075_298_892_414_161_999_234_649,
    0.209_482_141_084_727_828_012_999_174_891_714,
];

const WG: [f64; 4] = [
    0.129_484_966_168_869_693_270_611_432_679_082,
    0.279_705_391_489_276_667_901_467_771_423_780,
    0.381_830_050_505_118_944_950_369_775_488_975,
    0.417_959_183_673_469_387_755_102_040_816_327,
];

const EVALS_PER_RULE: usize = 15;

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

fn gauss_kronrod<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> Result<Segment> {
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let eval = |x: f64| -> Result<f64> {
        let y = f(x);
        if y.is_finite() {
            Ok(y)
        } else {
            Err(NrError::integration(
                format!("non-finite integrand value {y} at x = {x}"),
                f64::NAN,
                f64::INFINITY,
            ))
        }
    };

    let fc = eval(center)?;
    let mut kronrod = WGK[7] * fc;
    let mut gauss = WG[3] * fc;
    for j in 0..7 {
        let dx = half * XGK[j];
        let pair = eval(center - dx)? + eval(center + dx)?;
        kronrod += WGK[j] * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    Ok(Segment {
        a,
        b,
        value: kronrod * half,
        error: ((kronrod - gauss) * half).abs(),
    })
}

// ---------------------------------------------------------------------------
// Adaptive driver
// ---------------------------------------------------------------------------

/// Outcome of a successful integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationResult {
    pub value: f64,
    /// Estimated absolute error; never negative.
    pub abs_error: f64,
    /// Integrand evaluations spent.
    pub evaluations: usize,
    /// Number of sub-intervals in the final partition.
    pub intervals: usize,
}

/// Globally adaptive Gauss–Kronrod quadrature.  Repeatedly bisects the
/// sub-interval with the largest error estimate until the summed estimate
/// meets `max(abs_tol, rel_tol * |value|)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrator {
    pub tolerance: Tolerance,
    /// Bisection budget.
    pub max_iterations: usize,
}

impl Integrator {
    pub fn new(tolerance: Tolerance, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    pub fn from_config(config: &ReaderConfig) -> Self {
        Self::new(config.integration_tolerance, config.max_iterations)
    }

    /// Integrate `f` over `[a, b]`.
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F, a: f64, b: f64) -> Result<IntegrationResult> {
        self.integrate_with_breakpoints(f, a, b, &[])
    }

    /// Like [`integrate`](Self::integrate), but the first partition is split
    /// at every breakpoint strictly inside the interval (kinks of a
    /// piecewise-linear integrand, for instance).
    pub fn integrate_with_breakpoints<F: Fn(f64) -> f64>(
        &self,
        f: F,
        a: f64,
        b: f64,
        breakpoints: &[f64],
    ) -> Result<IntegrationResult> {
        if !(a.is_finite() && b.is_finite()) {
            return Err(NrError::integration(
                format!("integration bounds must be finite, got [{a}, {b}]"),
                f64::NAN,
                f64::INFINITY,
            ));
        }
        if a == b {
            return Ok(IntegrationResult {
                value: 0.0,
                abs_error: 0.0,
                evaluations: 0,
                intervals: 0,
            });
        }
        let (lo, hi, sign) = if a < b { (a, b, 1.0) } else { (b, a, -1.0) };

        let mut edges: Vec<f64> = breakpoints
            .iter()
            .copied()
            .filter(|p| *p > lo && *p < hi)
            .collect();
        edges.sort_by(f64::total_cmp);
        edges.dedup();
        edges.insert(0, lo);
        edges.push(hi);

        let mut segments = edges
            .windows(2)
            .map(|w| gauss_kronrod(&f, w[0], w[1]))
            .collect::<Result<Vec<_>>>()?;
        let mut evaluations = segments.len() * EVALS_PER_RULE;
        let mut iterations = 0;

        loop {
            let (value, error) = totals(&segments);
            let target = self.tolerance.abs_tol.max(self.tolerance.rel_tol * value.abs());
            if error <= target {
                log::debug!(
                    "integrated [{lo}, {hi}] = {value:e} ± {error:e} after {iterations} bisections"
                );
                return Ok(IntegrationResult {
                    value: sign * value,
                    abs_error: error,
                    evaluations,
                    intervals: segments.len(),
                });
            }
            if iterations >= self.max_iterations {
                return Err(NrError::integration(
                    format!(
                        "tolerance {target:e} not reached within {} bisections",
                        self.max_iterations
                    ),
                    sign * value,
                    error,
                ));
            }

            let worst = worst_segment(&segments);
            let seg = segments[worst];
            let mid = 0.5 * (seg.a + seg.b);
            if mid <= seg.a || mid >= seg.b {
                return Err(NrError::integration(
                    format!("interval [{}, {}] cannot be bisected further", seg.a, seg.b),
                    sign * value,
                    error,
                ));
            }
            let left = gauss_kronrod(&f, seg.a, mid)?;
            let right = gauss_kronrod(&f, mid, seg.b)?;
            evaluations += 2 * EVALS_PER_RULE;
            segments[worst] = left;
            segments.insert(worst + 1, right);
            iterations += 1;
        }
    }
}

fn totals(segments: &[Segment]) -> (f64, f64) {
    segments
        .iter()
        .fold((0.0, 0.0), |(v, e), s| (v + s.value, e + s.error))
}

/// Index of the largest error estimate; the first one wins ties.
fn worst_segment(segments: &[Segment]) -> usize {
    let mut best = 0;
    for (i, s) in segments.iter().enumerate().skip(1) {
        if s.error > segments[best].error {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integrator(tol: f64, iters: usize) -> Integrator {
        Integrator::new(
            Tolerance {
                abs_tol: tol,
                rel_tol: 0.0,
            },
            iters,
        )
    }

    #[test]
    fn polynomials_are_exact() {
        let r = integrator(1e-12, 10).integrate(|x| 3.0 * x * x, 0.0, 2.0).unwrap();
        assert!((r.value - 8.0).abs() < 1e-12);
        assert_eq!(r.intervals, 1);
        assert_eq!(r.evaluations, 15);
    }

    #[test]
    fn reversed_bounds_flip_sign() {
        let i = integrator(1e-10, 50);
        let fwd = i.integrate(f64::exp, 0.0, 1.0).unwrap();
        let rev = i.integrate(f64::exp, 1.0, 0.0).unwrap();
        assert_eq!(fwd.value, -rev.value);
        assert!((fwd.value - (std::f64::consts::E - 1.0)).abs() < 1e-10);
    }

    #[test]
    fn empty_interval_is_zero() {
        let r = integrator(1e-10, 0).integrate(|x| x, 2.0, 2.0).unwrap();
        assert_eq!(r.value, 0.0);
        assert_eq!(r.abs_error, 0.0);
    }

    #[test]
    fn endpoint_singularity_needs_bisections() {
        let r = integrator(1e-8, 200).integrate(f64::sqrt, 0.0, 1.0).unwrap();
        assert!((r.value - 2.0 / 3.0).abs() < 1e-8);
        assert!(r.intervals > 1);
    }

    #[test]
    fn exhausted_budget_is_an_error() {
        let err = integrator(1e-12, 0).integrate(f64::sqrt, 0.0, 1.0).unwrap_err();
        match err {
            NrError::Integration { value, abs_error, .. } => {
                assert!((value - 2.0 / 3.0).abs() < 1e-2);
                assert!(abs_error > 1e-12);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_finite_integrand_is_an_error() {
        let err = integrator(1e-6, 10).integrate(|x| 1.0 / x, -1.0, 1.0).unwrap_err();
        assert!(matches!(err, NrError::Integration { .. }));
    }

    #[test]
    fn breakpoints_resolve_kinks() {
        let kinked = |x: f64| (x - 0.3).abs();
        let i = integrator(1e-12, 0);
        assert!(i.integrate(kinked, 0.0, 1.0).is_err());
        let r = i.integrate_with_breakpoints(kinked, 0.0, 1.0, &[0.3, 5.0]).unwrap();
        assert!((r.value - (0.045 + 0.245)).abs() < 1e-12);
        assert_eq!(r.intervals, 2);
    }
}
