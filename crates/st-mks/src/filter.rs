// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Frequency-domain convolution filter holding a fitted influence kernel.
//!
//! The kernel is stored in the half-spectrum layout with shape
//! `(1, f_1, .., f_d, n_states)`. The leading singleton axis lets the kernel
//! broadcast against the sample axis of a discretized field. Because the last
//! spatial axis only keeps its non-negative frequencies, the filter also
//! remembers the real-space support `(s_1, .., s_d)` so the kernel can be
//! brought back to real space.

use std::ops::Range;

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use num_complex::Complex64;
use tracing::debug;

use crate::basis::BasisDescriptor;
use crate::error::FilterError;
use crate::spectral::{fftshift, half_spectrum_shape, ifftshift, irfftn, rfftn};

#[derive(Clone, Debug)]
pub struct Filter {
    kernel: ArrayD<Complex64>,
    basis: BasisDescriptor,
    spatial_shape: Vec<usize>,
    jobs: usize,
}

fn expected_kernel_shape(spatial_shape: &[usize], n_states: usize) -> Vec<usize> {
    let mut shape = Vec::with_capacity(spatial_shape.len() + 2);
    shape.push(1);
    shape.extend(half_spectrum_shape(spatial_shape));
    shape.push(n_states);
    shape
}

impl Filter {
    /// Wraps a frequency kernel fitted for fields with spatial shape
    /// `spatial_shape`.
    pub fn new(
        kernel: ArrayD<Complex64>,
        basis: BasisDescriptor,
        spatial_shape: Vec<usize>,
        jobs: usize,
    ) -> Result<Self, FilterError> {
        let expected = expected_kernel_shape(&spatial_shape, basis.n_states);
        if spatial_shape.is_empty() || spatial_shape.contains(&0) || kernel.shape() != expected {
            return Err(FilterError::KernelShape {
                expected,
                actual: kernel.shape().to_vec(),
            });
        }
        Ok(Self {
            kernel,
            basis,
            spatial_shape,
            jobs: jobs.max(1),
        })
    }

    /// Builds a filter from a real-space kernel of shape
    /// `(s_1, .., s_d, n_states)` whose zero offset sits at index `s_i / 2`.
    pub fn from_real_space_centered(
        kernel: &ArrayD<f64>,
        basis: BasisDescriptor,
        jobs: usize,
    ) -> Result<Self, FilterError> {
        let rank = kernel.ndim();
        if rank < 2 {
            return Err(FilterError::KernelShape {
                expected: vec![0, basis.n_states],
                actual: kernel.shape().to_vec(),
            });
        }
        let spatial = 0..rank - 1;
        let spatial_shape = kernel.shape()[spatial.clone()].to_vec();
        let unshifted = ifftshift(kernel, spatial.clone())?;
        let frequency = rfftn(&unshifted, spatial, jobs)?;
        Self::new(frequency.insert_axis(Axis(0)), basis, spatial_shape, jobs)
    }

    fn spatial_axes(&self) -> Range<usize> {
        1..self.kernel.ndim() - 1
    }

    pub fn kernel_shape(&self) -> &[usize] {
        self.kernel.shape()
    }

    /// Half-spectrum shape of the spatial axes, without sample or state axes.
    pub fn frequency_shape(&self) -> &[usize] {
        &self.kernel.shape()[self.spatial_axes()]
    }

    /// Real-space support of the kernel.
    pub fn spatial_shape(&self) -> &[usize] {
        &self.spatial_shape
    }

    pub fn frequency_kernel(&self) -> ArrayViewD<'_, Complex64> {
        self.kernel.view()
    }

    pub fn basis(&self) -> &BasisDescriptor {
        &self.basis
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Convolves a discretized field `(n_samples, s_1, .., s_d, n_states)`
    /// with the kernel and returns the real response `(n_samples, s_1, .., s_d)`.
    ///
    /// The field's spatial shape may differ from the fitted one as long as its
    /// half spectrum lines up with the stored kernel.
    pub fn convolve(&self, discretized: &ArrayD<f64>) -> Result<ArrayD<f64>, FilterError> {
        let rank = self.kernel.ndim();
        let shape = discretized.shape();
        let compatible = shape.len() == rank
            && shape[0] > 0
            && shape[rank - 1] == self.basis.n_states
            && half_spectrum_shape(&shape[1..rank - 1]) == self.frequency_shape();
        if !compatible {
            return Err(FilterError::Dimensions {
                kernel: self.kernel.shape().to_vec(),
                actual: shape.to_vec(),
            });
        }

        let axes = self.spatial_axes();
        let fx = rfftn(discretized, axes.clone(), self.jobs)?;
        let kernel = self
            .kernel
            .broadcast(fx.raw_dim())
            .ok_or_else(|| FilterError::Dimensions {
                kernel: self.kernel.shape().to_vec(),
                actual: shape.to_vec(),
            })?;
        let fy = (&fx * &kernel).sum_axis(Axis(rank - 1));
        let response = irfftn(&fy, axes, &shape[1..rank - 1], self.jobs)?;
        debug!(
            target: "st_mks::filter",
            samples = shape[0],
            spatial = ?&shape[1..rank - 1],
            "convolved discretized field"
        );
        Ok(response)
    }

    /// Real-space kernel `(1, s_1, .., s_d, n_states)` with the zero offset
    /// moved to the centre of every spatial axis. Always a fresh array.
    pub fn to_real_space_centered(&self) -> Result<ArrayD<f64>, FilterError> {
        let axes = self.spatial_axes();
        let real = irfftn(&self.kernel, axes.clone(), &self.spatial_shape, self.jobs)?;
        Ok(fftshift(&real, axes)?)
    }

    /// Changes the real-space support of the kernel to `size`.
    ///
    /// Growing an axis zero-pads around the centred kernel, shrinking crops it;
    /// cropping removes exactly what padding to the larger size added, so a
    /// grow/shrink pair restores the original kernel.
    pub fn resize(&mut self, size: &[usize]) -> Result<(), FilterError> {
        if size.len() != self.spatial_shape.len() {
            return Err(FilterError::ResizeRank {
                expected: self.spatial_shape.len(),
                actual: size.len(),
            });
        }
        if size.contains(&0) {
            return Err(FilterError::EmptyAxis {
                size: size.to_vec(),
            });
        }

        let real = self.to_real_space_centered()?;
        let resized = pad_or_crop(&real, size);
        let axes = self.spatial_axes();
        let unshifted = ifftshift(&resized, axes.clone())?;
        self.kernel = rfftn(&unshifted, axes, self.jobs)?;
        debug!(
            target: "st_mks::filter",
            from = ?self.spatial_shape,
            to = ?size,
            "resized influence kernel"
        );
        self.spatial_shape = size.to_vec();
        Ok(())
    }
}

/// Source and destination ranges along one axis going from `old` to `new`
/// entries; the extra (or removed) `d` entries are split `d - d / 2` before
/// and `d / 2` after.
fn placement(old: usize, new: usize) -> (Range<usize>, Range<usize>) {
    if new >= old {
        let before = (new - old) - (new - old) / 2;
        (0..old, before..before + old)
    } else {
        let before = (old - new) - (old - new) / 2;
        (before..before + new, 0..new)
    }
}

fn pad_or_crop(real: &ArrayD<f64>, size: &[usize]) -> ArrayD<f64> {
    let mut shape = real.shape().to_vec();
    shape[1..=size.len()].copy_from_slice(size);
    let ranges: Vec<(Range<usize>, Range<usize>)> = real
        .shape()
        .iter()
        .zip(&shape)
        .map(|(&old, &new)| placement(old, new))
        .collect();

    let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
    let src = real.slice_each_axis(|ax| Slice::from(ranges[ax.axis.index()].0.clone()));
    out.slice_each_axis_mut(|ax| Slice::from(ranges[ax.axis.index()].1.clone()))
        .assign(&src);
    out
}
