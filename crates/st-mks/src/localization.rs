// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! MKS localization model.
//!
//! The model learns influence coefficients that map a discretized
//! microstructure to its response field through a convolution. Fitting works
//! in frequency space where the convolution becomes a product, so the global
//! regression falls apart into one small least-squares system per frequency
//! bin:
//!
//! 1. discretize `X` into local-state weights `X′`;
//! 2. transform `X′` and `y` over the spatial axes;
//! 3. at every bin solve `FX[:, bin, subset] · k = Fy[:, bin]`, where the
//!    basis decides which state columns are independent at that bin;
//! 4. hand the assembled kernel to a [`Filter`] for prediction.

use std::borrow::Cow;
use std::ops::Range;

use nalgebra::{DMatrix, DVector};
use ndarray::{ArrayD, Axis, Dimension, IxDyn, Slice};
use num_complex::Complex64;
use rayon::prelude::*;
use tracing::{debug, debug_span};

use crate::basis::{build_basis, BasisDescriptor, Domain, LocalStateBasis};
use crate::error::{MksError, MksResult, ShapeError};
use crate::filter::Filter;
use crate::lstsq::solve_least_squares;
use crate::parallel;
use crate::reshape::reshape_feature;
use crate::spectral::rfftn;

/// Influence-coefficient regression in Fourier space.
#[derive(Debug)]
pub struct LocalizationModel {
    descriptor: BasisDescriptor,
    basis: Box<dyn LocalStateBasis>,
    jobs: usize,
    filter: Option<Filter>,
}

impl LocalizationModel {
    /// Creates an unfitted model for the described basis. The job count
    /// defaults to [`st_mks_config::default_jobs`].
    pub fn new(descriptor: BasisDescriptor) -> MksResult<Self> {
        Ok(Self {
            basis: build_basis(&descriptor)?,
            descriptor,
            jobs: st_mks_config::default_jobs(),
            filter: None,
        })
    }

    /// Creates a model that discretizes like `basis`; only its family,
    /// state count and domain are read.
    pub fn from_basis(basis: &dyn LocalStateBasis) -> MksResult<Self> {
        Self::new(basis.descriptor())
    }

    /// Overrides the number of local states while keeping family and domain.
    pub fn with_states(mut self, n_states: usize) -> MksResult<Self> {
        let descriptor = self.descriptor.with_states(n_states)?;
        self.basis = build_basis(&descriptor)?;
        self.descriptor = descriptor;
        Ok(self)
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn basis(&self) -> &dyn LocalStateBasis {
        self.basis.as_ref()
    }

    pub fn n_states(&self) -> usize {
        self.descriptor.n_states
    }

    pub fn domain(&self) -> Domain {
        self.descriptor.domain
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn is_fitted(&self) -> bool {
        self.filter.is_some()
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Installs a prepared filter, replacing any fitted one.
    ///
    /// The filter must have been built for the model's basis; otherwise the
    /// model is left unchanged.
    pub fn set_filter(&mut self, filter: Filter) -> MksResult<()> {
        if filter.basis() != &self.descriptor {
            return Err(MksError::BasisMismatch {
                model: self.descriptor,
                filter: *filter.basis(),
            });
        }
        self.filter = Some(filter);
        Ok(())
    }

    /// Fits influence coefficients so that convolving the discretized `x`
    /// reproduces `y`.
    ///
    /// `size` optionally reshapes the spatial axes of both fields first. On
    /// error the model keeps its previous basis and filter.
    pub fn fit(
        &mut self,
        x: &ArrayD<f64>,
        y: &ArrayD<f64>,
        size: Option<&[usize]>,
    ) -> MksResult<()> {
        let span = debug_span!(target: "st_mks::localization", "fit", basis = %self.descriptor.kind);
        let _entered = span.enter();

        let basis = build_basis(&self.descriptor)?;
        let (x, y): (Cow<'_, ArrayD<f64>>, Cow<'_, ArrayD<f64>>) = match size {
            Some(size) => {
                let y = reshape_feature(y, size)?;
                let x = reshape_feature(x, size)?;
                (Cow::Owned(x), Cow::Owned(y))
            }
            None => (Cow::Borrowed(x), Cow::Borrowed(y)),
        };
        if y.ndim() <= 1 {
            return Err(ShapeError::ResponseRank { rank: y.ndim() }.into());
        }
        if x.shape() != y.shape() {
            return Err(ShapeError::Mismatch {
                x: x.shape().to_vec(),
                y: y.shape().to_vec(),
            }
            .into());
        }
        if y.shape()[0] == 0 {
            return Err(ShapeError::NoSamples.into());
        }

        let discretized = basis.discretize(x.view())?;
        let spatial = 1..y.ndim();
        let fx = rfftn(&discretized, spatial.clone(), self.jobs)?;
        let fy = rfftn(&y, spatial, self.jobs)?;
        let kernel = solve_bins(basis.as_ref(), &fx, &fy, self.jobs)?;
        let filter = Filter::new(
            kernel.insert_axis(Axis(0)),
            self.descriptor,
            y.shape()[1..].to_vec(),
            self.jobs,
        )?;
        debug!(
            target: "st_mks::localization",
            samples = y.shape()[0],
            spatial = ?&y.shape()[1..],
            states = self.descriptor.n_states,
            "fitted influence coefficients"
        );

        self.basis = basis;
        self.filter = Some(filter);
        Ok(())
    }

    /// Predicts the response of `x`, returned with the same shape as `x`.
    pub fn predict(&self, x: &ArrayD<f64>) -> MksResult<ArrayD<f64>> {
        let filter = self.filter.as_ref().ok_or(MksError::NotFitted)?;
        let shaped = reshape_feature(x, filter.frequency_shape())?;
        let discretized = self.basis.discretize(shaped.view())?;
        let response = filter.convolve(&discretized)?;
        let from = response.shape().to_vec();
        response
            .into_shape(IxDyn(x.shape()))
            .map_err(|_| {
                ShapeError::Reshape {
                    from,
                    to: x.shape().to_vec(),
                }
                .into()
            })
    }

    /// Influence coefficients in real space with the zero offset at the
    /// centre of every spatial axis, shape `(s_1, .., s_d, n_states)`.
    pub fn coeff(&self) -> MksResult<ArrayD<f64>> {
        let filter = self.filter.as_ref().ok_or(MksError::NotFitted)?;
        Ok(filter.to_real_space_centered()?.index_axis_move(Axis(0), 0))
    }

    /// Changes the spatial support of the fitted coefficients to `size`.
    pub fn resize_coeff(&mut self, size: &[usize]) -> MksResult<()> {
        let filter = self.filter.as_mut().ok_or(MksError::NotFitted)?;
        filter.resize(size)?;
        Ok(())
    }

    /// Coefficient of determination of `predict(x)` against `y` over every
    /// response element.
    pub fn score(&self, x: &ArrayD<f64>, y: &ArrayD<f64>) -> MksResult<f64> {
        let predicted = self.predict(x)?;
        if predicted.shape() != y.shape() {
            return Err(ShapeError::Mismatch {
                x: predicted.shape().to_vec(),
                y: y.shape().to_vec(),
            }
            .into());
        }
        let mean = y.mean().unwrap_or(0.0);
        let ss_res: f64 = predicted
            .iter()
            .zip(y.iter())
            .map(|(p, t)| (t - p).powi(2))
            .sum();
        let ss_tot: f64 = y.iter().map(|t| (t - mean).powi(2)).sum();
        if ss_tot == 0.0 {
            return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
        }
        Ok(1.0 - ss_res / ss_tot)
    }
}

type BinSolution = (Range<usize>, DVector<Complex64>);

fn solve_bin(
    basis: &dyn LocalStateBasis,
    fx: &ArrayD<Complex64>,
    fy: &ArrayD<Complex64>,
    bin: &[usize],
) -> MksResult<BinSolution> {
    let subset = basis.independent_subset(bin);
    let mut columns = fx.view();
    let mut rhs = fy.view();
    for &index in bin {
        columns = columns.index_axis_move(Axis(1), index);
        rhs = rhs.index_axis_move(Axis(1), index);
    }
    if subset.is_empty() {
        return Ok((subset, DVector::zeros(0)));
    }

    let n_samples = rhs.len();
    let a = DMatrix::from_fn(n_samples, subset.len(), |r, c| {
        columns[[r, subset.start + c]]
    });
    let b = DVector::from_iterator(n_samples, rhs.iter().copied());
    let k = solve_least_squares(a, &b).map_err(|reason| MksError::Solve {
        bin: bin.to_vec(),
        reason: reason.to_string(),
    })?;
    Ok((subset, k))
}

/// Solves every frequency bin independently and scatters the coefficients
/// into a `(f_1, .., f_d, n_states)` kernel.
fn solve_bins(
    basis: &dyn LocalStateBasis,
    fx: &ArrayD<Complex64>,
    fy: &ArrayD<Complex64>,
    jobs: usize,
) -> MksResult<ArrayD<Complex64>> {
    let rank = fx.ndim();
    let n_states = fx.shape()[rank - 1];
    let mut shape = fx.shape()[1..rank - 1].to_vec();
    let bins: Vec<Vec<usize>> = ndarray::indices(IxDyn(&shape))
        .into_iter()
        .map(|index| index.slice().to_vec())
        .collect();

    let solve = |bin: &Vec<usize>| solve_bin(basis, fx, fy, bin);
    let solutions: Vec<BinSolution> = if jobs > 1 {
        parallel::install(jobs, || bins.par_iter().map(solve).collect::<MksResult<_>>())?
    } else {
        bins.iter().map(solve).collect::<MksResult<_>>()?
    };

    shape.push(n_states);
    let mut kernel = ArrayD::<Complex64>::zeros(IxDyn(&shape));
    for (bin, (subset, coefficients)) in bins.iter().zip(solutions) {
        let mut lane = kernel.view_mut();
        for &index in bin {
            lane = lane.index_axis_move(Axis(0), index);
        }
        lane.slice_axis_mut(Axis(0), Slice::from(subset))
            .iter_mut()
            .zip(coefficients.iter())
            .for_each(|(slot, value)| *slot = *value);
    }
    debug!(
        target: "st_mks::localization",
        bins = bins.len(),
        states = n_states,
        "solved frequency bins"
    );
    Ok(kernel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisKind;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};

    fn prim2() -> LocalizationModel {
        LocalizationModel::new(BasisDescriptor::primitive(2, Some((0.0, 1.0))).unwrap())
            .unwrap()
            .with_jobs(1)
    }

    fn transposed_pair() -> (ArrayD<f64>, ArrayD<f64>) {
        let x = Array::linspace(0.0, 1.0, 4)
            .into_shape((1, 2, 2))
            .unwrap()
            .into_dyn();
        let y = x.view().permuted_axes(vec![0, 2, 1]).to_owned();
        (x, y)
    }

    #[test]
    fn fit_recovers_known_two_by_two_kernel() {
        let (x, y) = transposed_pair();
        let mut model = prim2();
        model.fit(&x, &y, None).unwrap();
        let kernel = model.filter().unwrap().frequency_kernel();
        assert_eq!(kernel.shape(), &[1, 2, 2, 2]);
        let expected = [
            [[0.5, 0.5], [-2.0, 0.0]],
            [[-0.5, 0.0], [-1.0, 0.0]],
        ];
        for i in 0..2 {
            for j in 0..2 {
                for s in 0..2 {
                    let value = kernel[[0, i, j, s]];
                    assert_abs_diff_eq!(value.re, expected[i][j][s], epsilon = 1e-10);
                    assert_abs_diff_eq!(value.im, 0.0, epsilon = 1e-10);
                }
            }
        }
    }

    #[test]
    fn predict_reproduces_training_response() {
        let (x, y) = transposed_pair();
        let mut model = prim2();
        model.fit(&x, &y, None).unwrap();
        let predicted = model.predict(&x).unwrap();
        assert_eq!(predicted.shape(), y.shape());
        for (p, t) in predicted.iter().zip(y.iter()) {
            assert_abs_diff_eq!(p, t, epsilon = 1e-10);
        }
        assert_abs_diff_eq!(model.score(&x, &y).unwrap(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn predict_before_fit_is_a_state_error() {
        let (x, _) = transposed_pair();
        let model = prim2();
        assert!(matches!(model.predict(&x), Err(MksError::NotFitted)));
        assert!(matches!(model.coeff(), Err(MksError::NotFitted)));
        let err = model.predict(&x).unwrap_err();
        assert_eq!(err.to_string(), "fit must be run before predict");
    }

    #[test]
    fn rank_one_response_is_rejected() {
        let mut model = prim2();
        let x = array![0.1, 0.2, 0.3].into_dyn();
        let err = model.fit(&x, &x, None).unwrap_err();
        assert!(matches!(
            err,
            MksError::Shape(ShapeError::ResponseRank { rank: 1 })
        ));
        assert!(!model.is_fitted());
    }

    #[test]
    fn mismatched_shapes_leave_previous_fit_untouched() {
        let (x, y) = transposed_pair();
        let mut model = prim2();
        model.fit(&x, &y, None).unwrap();
        let before = model.coeff().unwrap();

        let other = ArrayD::<f64>::zeros(IxDyn(&[1, 4]));
        let err = model.fit(&x, &other, None).unwrap_err();
        assert!(matches!(err, MksError::Shape(ShapeError::Mismatch { .. })));
        assert_eq!(model.coeff().unwrap(), before);
    }

    #[test]
    fn size_reshapes_before_fitting() {
        let x = Array::linspace(0.0, 1.0, 8)
            .into_shape((2, 4))
            .unwrap()
            .into_dyn();
        let y = x.mapv(|v| 2.0 * v);
        let mut model = prim2();
        model.fit(&x, &y, Some(&[2, 2])).unwrap();
        assert_eq!(model.filter().unwrap().spatial_shape(), &[2, 2]);

        let err = model.fit(&x, &y, Some(&[3, 2])).unwrap_err();
        assert!(matches!(err, MksError::Shape(ShapeError::Reshape { .. })));
    }

    #[test]
    fn out_of_domain_fields_fail_discretization() {
        let mut model = prim2();
        let x = array![[0.0, 2.0]].into_dyn();
        let err = model.fit(&x, &x, None).unwrap_err();
        assert!(matches!(err, MksError::Basis(_)));
    }

    #[test]
    fn filter_for_another_basis_is_rejected() {
        let kernel = ArrayD::<f64>::ones(IxDyn(&[3, 2]));
        let legendre = BasisDescriptor::legendre(2, Some((0.0, 1.0))).unwrap();
        let foreign = Filter::from_real_space_centered(&kernel, legendre, 1).unwrap();
        let mut model = prim2();
        let err = model.set_filter(foreign).unwrap_err();
        assert!(matches!(
            err,
            MksError::BasisMismatch { model: ours, filter: theirs }
                if ours.kind == BasisKind::Primitive && theirs.kind == BasisKind::Legendre
        ));
        assert!(!model.is_fitted());

        let own = Filter::from_real_space_centered(&kernel, model.descriptor, 1).unwrap();
        model.set_filter(own).unwrap();
        assert!(model.is_fitted());
        assert_eq!(model.coeff().unwrap().shape(), &[3, 2]);
    }

    #[test]
    fn with_states_rebuilds_basis() {
        let model = prim2().with_states(5).unwrap();
        assert_eq!(model.n_states(), 5);
        assert_eq!(model.basis().n_states(), 5);
        assert_eq!(model.domain(), Domain { low: 0.0, high: 1.0 });
    }
}
