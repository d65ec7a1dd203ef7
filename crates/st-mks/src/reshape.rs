// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use ndarray::{ArrayD, IxDyn};

use crate::error::ShapeError;

/// True when `shape` already has `size` as its half spectrum, i.e. the ranks
/// agree and the last axis satisfies `n / 2 + 1 == size[-1]`.
///
/// Only meaningful for the real-input transform layout used by the filter:
/// a kernel stored as a half spectrum reports a last-axis length that no
/// real-space field shares, so such a field must keep its own shape.
pub fn matches_half_spectrum(shape: &[usize], size: &[usize]) -> bool {
    match (shape.last(), size.last()) {
        (Some(&last), Some(&target)) => shape.len() - 1 == size.len() && last / 2 + 1 == target,
        _ => false,
    }
}

/// Reshapes `(n_samples, ...)` so its spatial axes equal `size`.
///
/// When [`matches_half_spectrum`] holds the array keeps its own spatial shape
/// instead. Elements are taken in row-major order.
pub fn reshape_feature<A: Clone>(
    array: &ArrayD<A>,
    size: &[usize],
) -> Result<ArrayD<A>, ShapeError> {
    let Some(&n_samples) = array.shape().first() else {
        return Err(ShapeError::Reshape {
            from: Vec::new(),
            to: size.to_vec(),
        });
    };
    let spatial: &[usize] = if matches_half_spectrum(array.shape(), size) {
        &array.shape()[1..]
    } else {
        size
    };
    let mut target = Vec::with_capacity(spatial.len() + 1);
    target.push(n_samples);
    target.extend_from_slice(spatial);

    if target.iter().product::<usize>() != array.len() {
        return Err(ShapeError::Reshape {
            from: array.shape().to_vec(),
            to: target,
        });
    }
    array
        .as_standard_layout()
        .into_owned()
        .into_shape(IxDyn(&target))
        .map_err(|_| ShapeError::Reshape {
            from: array.shape().to_vec(),
            to: target.clone(),
        })
}
