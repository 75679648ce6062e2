use serde::{Deserialize, Serialize};

use crate::config::ReaderConfig;
use crate::data::model::{MergedDataset, MergedSample, MergedSlice};
use crate::error::{NrError, Result};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// How values inside the neighbourhood of a singularity are replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegularisationPolicy {
    /// Clamp into the range of the nearest finite values just outside.
    #[default]
    Clip,
    /// Polynomial through the nearest finite values outside.
    Extrapolate,
    /// A configured constant.
    Floor,
}

// ---------------------------------------------------------------------------
// Patch – the replacement rule built from neighbouring values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Patch {
    Constant(f64),
    Clamp {
        left: Option<(f64, f64)>,
        right: Option<(f64, f64)>,
    },
    Polynomial(Vec<(f64, f64)>),
}

impl Patch {
    fn apply(&self, x: f64, value: f64) -> f64 {
        match self {
            Patch::Constant(c) => *c,
            Patch::Clamp { left, right } => {
                let (lo, hi) = clamp_range(*left, *right);
                if value.is_nan() {
                    nearest(x, *left, *right)
                } else {
                    value.clamp(lo, hi)
                }
            }
            Patch::Polynomial(nodes) => lagrange(nodes, x),
        }
    }
}

fn clamp_range(left: Option<(f64, f64)>, right: Option<(f64, f64)>) -> (f64, f64) {
    match (left, right) {
        (Some((_, a)), Some((_, b))) => (a.min(b), a.max(b)),
        (Some((_, a)), None) | (None, Some((_, a))) => (a, a),
        // Patch::Clamp is never built without a neighbour.
        (None, None) => (f64::NEG_INFINITY, f64::INFINITY),
    }
}

fn nearest(x: f64, left: Option<(f64, f64)>, right: Option<(f64, f64)>) -> f64 {
    match (left, right) {
        (Some((lx, lv)), Some((rx, rv))) => {
            if (x - lx).abs() <= (rx - x).abs() {
                lv
            } else {
                rv
            }
        }
        (Some((_, v)), None) | (None, Some((_, v))) => v,
        (None, None) => f64::NAN,
    }
}

/// Evaluate the Lagrange interpolating polynomial through `nodes` at `x`.
fn lagrange(nodes: &[(f64, f64)], x: f64) -> f64 {
    nodes
        .iter()
        .enumerate()
        .map(|(i, &(xi, yi))| {
            let basis: f64 = nodes
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, &(xj, _))| (x - xj) / (xi - xj))
                .product();
            yi * basis
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Regulariser
// ---------------------------------------------------------------------------

/// Replaces values within `radius` of a singular coordinate, and only those.
#[derive(Debug, Clone, PartialEq)]
pub struct Regulariser {
    pub policy: RegularisationPolicy,
    pub radius: f64,
    pub floor_value: Option<f64>,
    pub extrapolation_order: usize,
}

impl Regulariser {
    pub fn new(policy: RegularisationPolicy, radius: f64) -> Self {
        Self {
            policy,
            radius,
            floor_value: None,
            extrapolation_order: 2,
        }
    }

    pub fn with_floor(mut self, value: f64) -> Self {
        self.floor_value = Some(value);
        self
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.extrapolation_order = order;
        self
    }

    pub fn from_config(config: &ReaderConfig) -> Self {
        Self {
            policy: config.regularisation_policy,
            radius: config.regularisation_radius,
            floor_value: config.floor_value,
            extrapolation_order: config.extrapolation_order,
        }
    }

    /// Open neighbourhood `|x - singularity| < radius`.
    pub fn in_neighbourhood(&self, x: f64, singularity: f64) -> bool {
        (x - singularity).abs() < self.radius
    }

    /// Regularise one merged slice around `singularity`.
    ///
    /// Samples outside the neighbourhood are copied untouched.
    pub fn apply(&self, slice: &MergedSlice, singularity: f64) -> Result<MergedSlice> {
        let inside: Vec<usize> = (0..slice.samples.len())
            .filter(|&i| self.in_neighbourhood(slice.samples[i].x, singularity))
            .collect();
        if inside.is_empty() {
            return Ok(slice.clone());
        }

        let outside: Vec<(f64, f64)> = slice
            .samples
            .iter()
            .filter(|s| !self.in_neighbourhood(s.x, singularity) && s.value.is_finite())
            .map(|s| (s.x, s.value))
            .collect();
        let patch = self
            .build_patch(&outside, singularity)
            .map_err(|e| annotate(e, slice.time))?;

        let mut samples = slice.samples.clone();
        for i in inside {
            let MergedSample { x, value, .. } = samples[i];
            samples[i].value = patch.apply(x, value);
        }
        log::debug!(
            "regularised t = {} around {singularity} with {:?}",
            slice.time,
            self.policy
        );
        Ok(MergedSlice {
            samples,
            ..slice.clone()
        })
    }

    /// Regularise every time slice of a dataset.
    pub fn apply_dataset(&self, dataset: &MergedDataset, singularity: f64) -> Result<MergedDataset> {
        let slices = dataset
            .slices
            .iter()
            .map(|s| self.apply(s, singularity))
            .collect::<Result<Vec<_>>>()?;
        Ok(MergedDataset {
            variable: dataset.variable.clone(),
            slices,
        })
    }

    /// Regularise an analytic function.  Clip and extrapolate probe `f` at
    /// `singularity ± radius * (1 + k/2)`, just outside the neighbourhood.
    pub fn regularise_fn<F>(&self, f: F, singularity: f64) -> Result<RegularisedFn<F>>
    where
        F: Fn(f64) -> f64,
    {
        let probes = self.extrapolation_order.max(1) + 1;
        let outside: Vec<(f64, f64)> = (0..probes)
            .flat_map(|k| {
                let d = self.radius * (1.0 + 0.5 * k as f64);
                [singularity - d, singularity + d]
            })
            .map(|x| (x, f(x)))
            .filter(|(_, v)| v.is_finite())
            .collect();
        let patch = self.build_patch(&outside, singularity)?;
        Ok(RegularisedFn {
            f,
            singularity,
            radius: self.radius,
            patch,
        })
    }

    fn build_patch(&self, outside: &[(f64, f64)], singularity: f64) -> Result<Patch> {
        match self.policy {
            RegularisationPolicy::Floor => self
                .floor_value
                .map(Patch::Constant)
                .ok_or_else(|| NrError::Regularisation("floor policy without a floor_value".into())),
            RegularisationPolicy::Clip => {
                let left = outside
                    .iter()
                    .filter(|(x, _)| *x < singularity)
                    .max_by(|a, b| a.0.total_cmp(&b.0))
                    .copied();
                let right = outside
                    .iter()
                    .filter(|(x, _)| *x > singularity)
                    .min_by(|a, b| a.0.total_cmp(&b.0))
                    .copied();
                if left.is_none() && right.is_none() {
                    return Err(NrError::Regularisation(format!(
                        "no finite values outside radius {} of {singularity} to clip against",
                        self.radius
                    )));
                }
                Ok(Patch::Clamp { left, right })
            }
            RegularisationPolicy::Extrapolate => {
                let needed = self.extrapolation_order + 1;
                let mut nodes: Vec<(f64, f64)> = outside.to_vec();
                nodes.sort_by(|a, b| {
                    (a.0 - singularity)
                        .abs()
                        .total_cmp(&(b.0 - singularity).abs())
                        .then_with(|| a.0.total_cmp(&b.0))
                });
                nodes.dedup_by(|a, b| a.0 == b.0);
                if nodes.len() < needed {
                    return Err(NrError::Regularisation(format!(
                        "degree-{} extrapolation needs {needed} finite values outside radius {} of {singularity}, found {}",
                        self.extrapolation_order,
                        self.radius,
                        nodes.len()
                    )));
                }
                nodes.truncate(needed);
                Ok(Patch::Polynomial(nodes))
            }
        }
    }
}

fn annotate(err: NrError, time: f64) -> NrError {
    match err {
        NrError::Regularisation(msg) => NrError::Regularisation(format!("t = {time}: {msg}")),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Regularised analytic function
// ---------------------------------------------------------------------------

/// `f` with its singular neighbourhood patched.
pub struct RegularisedFn<F> {
    f: F,
    singularity: f64,
    radius: f64,
    patch: Patch,
}

impl<F: Fn(f64) -> f64> RegularisedFn<F> {
    pub fn eval(&self, x: f64) -> f64 {
        if (x - self.singularity).abs() < self.radius {
            // Floor and polynomial patches never look at f inside.
            let raw = match self.patch {
                Patch::Clamp { .. } => (self.f)(x),
                _ => f64::NAN,
            };
            self.patch.apply(x, raw)
        } else {
            (self.f)(x)
        }
    }
}
