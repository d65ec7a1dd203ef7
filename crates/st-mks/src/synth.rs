// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Synthetic calibration data: random microstructures and the responses a
//! known influence kernel produces for them.

use ndarray::{ArrayD, IxDyn};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::basis::{build_basis, BasisDescriptor, Domain};
use crate::error::MksResult;
use crate::filter::Filter;

/// Field of `shape` with values drawn uniformly from the closed domain.
pub fn random_microstructure<R: Rng + ?Sized>(
    shape: &[usize],
    domain: Domain,
    rng: &mut R,
) -> ArrayD<f64> {
    let dist = Uniform::new_inclusive(domain.low, domain.high);
    ArrayD::from_shape_fn(IxDyn(shape), |_| dist.sample(rng))
}

/// Response of `x` under a real-space kernel `(s_1, .., s_d, n_states)` whose
/// zero offset sits at index `s_i / 2`.
///
/// `x` has shape `(n_samples, s_1, .., s_d)` and is discretized with the
/// described basis before the convolution.
pub fn convolve_response(
    kernel: &ArrayD<f64>,
    x: &ArrayD<f64>,
    basis: BasisDescriptor,
    jobs: usize,
) -> MksResult<ArrayD<f64>> {
    let filter = Filter::from_real_space_centered(kernel, basis, jobs)?;
    let discretized = build_basis(&basis)?.discretize(x.view())?;
    Ok(filter.convolve(&discretized)?)
}
