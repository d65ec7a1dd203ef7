// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Real-input multidimensional transforms over a contiguous range of axes.
//!
//! Kernels and discretized fields share the half-spectrum layout: every
//! transformed axis keeps all of its bins except the last one, which only
//! keeps the `n / 2 + 1` non-negative frequencies. Forward transforms are
//! unnormalized and inverse transforms scale by `1 / n` per axis, so
//! `irfftn(rfftn(x)) == x`.

use std::ops::Range;
use std::sync::Arc;

use ndarray::{ArrayD, ArrayView1, ArrayViewMut1, Axis, IxDyn, Slice, Zip};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::error::SpectralError;
use crate::parallel;

/// Shape of the half spectrum produced by [`rfftn`] for a real field of
/// shape `shape` (only the last entry changes).
pub fn half_spectrum_shape(shape: &[usize]) -> Vec<usize> {
    let mut out = shape.to_vec();
    if let Some(last) = out.last_mut() {
        *last = *last / 2 + 1;
    }
    out
}

fn check_axes<A>(array: &ArrayD<A>, axes: &Range<usize>) -> Result<(), SpectralError> {
    if axes.start >= axes.end || axes.end > array.ndim() {
        return Err(SpectralError::AxisRange {
            start: axes.start,
            end: axes.end,
            rank: array.ndim(),
        });
    }
    for axis in axes.clone() {
        if array.len_of(Axis(axis)) == 0 {
            return Err(SpectralError::EmptyAxis { axis });
        }
    }
    Ok(())
}

fn process_lane(fft: &dyn Fft<f64>, scale: f64, mut lane: ArrayViewMut1<'_, Complex64>) {
    let mut buf: Vec<Complex64> = lane.iter().copied().collect();
    fft.process(&mut buf);
    for (dst, src) in lane.iter_mut().zip(buf) {
        *dst = src * scale;
    }
}

fn transform_axis(
    data: &mut ArrayD<Complex64>,
    axis: usize,
    inverse: bool,
    planner: &mut FftPlanner<f64>,
    jobs: usize,
) {
    let n = data.len_of(Axis(axis));
    let fft: Arc<dyn Fft<f64>> = if inverse {
        planner.plan_fft_inverse(n)
    } else {
        planner.plan_fft_forward(n)
    };
    // rustfft leaves the inverse unnormalized.
    let scale = if inverse { 1.0 / n as f64 } else { 1.0 };
    let lanes = data.lanes_mut(Axis(axis));
    if jobs > 1 {
        parallel::install(jobs, || {
            Zip::from(lanes).par_for_each(|lane| process_lane(fft.as_ref(), scale, lane))
        });
    } else {
        Zip::from(lanes).for_each(|lane| process_lane(fft.as_ref(), scale, lane));
    }
}

/// Forward real-input transform of `field` over `axes`.
///
/// The last axis of the range is truncated to `n / 2 + 1` bins; axes outside
/// the range (sample axis, local-state axis) are carried through untouched.
pub fn rfftn(
    field: &ArrayD<f64>,
    axes: Range<usize>,
    jobs: usize,
) -> Result<ArrayD<Complex64>, SpectralError> {
    check_axes(field, &axes)?;
    let last = axes.end - 1;
    let mut planner = FftPlanner::new();

    let mut data = field.mapv(|v| Complex64::new(v, 0.0));
    transform_axis(&mut data, last, false, &mut planner, jobs);
    let keep = data.len_of(Axis(last)) / 2 + 1;
    let mut data = data
        .slice_axis(Axis(last), Slice::from(..keep))
        .to_owned();

    for axis in axes.start..last {
        transform_axis(&mut data, axis, false, &mut planner, jobs);
    }
    Ok(data)
}

fn hermitian_lane(
    fft: &dyn Fft<f64>,
    len: usize,
    mut dst: ArrayViewMut1<'_, f64>,
    src: ArrayView1<'_, Complex64>,
) {
    let half: Vec<Complex64> = src.iter().copied().collect();
    let kept = half.len();
    let mut buf: Vec<Complex64> = (0..len)
        .map(|k| if k < kept { half[k] } else { half[len - k].conj() })
        .collect();
    fft.process(&mut buf);
    let scale = 1.0 / len as f64;
    for (out, value) in dst.iter_mut().zip(buf) {
        *out = value.re * scale;
    }
}

/// Inverse of [`rfftn`]: `lengths` gives the real-space length of every axis
/// in `axes` (the last one cannot be recovered from the half spectrum alone).
pub fn irfftn(
    spectrum: &ArrayD<Complex64>,
    axes: Range<usize>,
    lengths: &[usize],
    jobs: usize,
) -> Result<ArrayD<f64>, SpectralError> {
    check_axes(spectrum, &axes)?;
    if lengths.len() != axes.len() {
        return Err(SpectralError::ShapeRank {
            expected: axes.len(),
            actual: lengths.len(),
        });
    }
    let last = axes.end - 1;
    for (axis, &len) in axes.clone().zip(lengths) {
        let expected = if axis == last { len / 2 + 1 } else { len };
        let actual = spectrum.len_of(Axis(axis));
        if len == 0 || actual != expected {
            return Err(SpectralError::HalfSpectrum {
                axis,
                len,
                expected,
                actual,
            });
        }
    }

    let mut planner = FftPlanner::new();
    let mut data = spectrum.clone();
    for axis in axes.start..last {
        transform_axis(&mut data, axis, true, &mut planner, jobs);
    }

    let len = lengths[lengths.len() - 1];
    let mut shape = data.shape().to_vec();
    shape[last] = len;
    let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
    let fft = planner.plan_fft_inverse(len);
    let zip = Zip::from(out.lanes_mut(Axis(last))).and(data.lanes(Axis(last)));
    if jobs > 1 {
        parallel::install(jobs, || {
            zip.par_for_each(|dst, src| hermitian_lane(fft.as_ref(), len, dst, src))
        });
    } else {
        zip.for_each(|dst, src| hermitian_lane(fft.as_ref(), len, dst, src));
    }
    Ok(out)
}

fn roll<A: Clone>(
    array: &ArrayD<A>,
    axes: Range<usize>,
    shift: impl Fn(usize) -> usize,
) -> Result<ArrayD<A>, SpectralError> {
    check_axes(array, &axes)?;
    let mut out = array.to_owned();
    for axis in axes {
        let n = out.len_of(Axis(axis));
        let s = shift(n) % n;
        if s == 0 {
            continue;
        }
        let src = out.clone();
        let ax = Axis(axis);
        out.slice_axis_mut(ax, Slice::from(s..))
            .assign(&src.slice_axis(ax, Slice::from(..n - s)));
        out.slice_axis_mut(ax, Slice::from(..s))
            .assign(&src.slice_axis(ax, Slice::from(n - s..)));
    }
    Ok(out)
}

/// Moves the zero-offset entry of every axis in `axes` to index `n / 2`.
pub fn fftshift<A: Clone>(
    array: &ArrayD<A>,
    axes: Range<usize>,
) -> Result<ArrayD<A>, SpectralError> {
    roll(array, axes, |n| n / 2)
}

/// Inverse of [`fftshift`].
pub fn ifftshift<A: Clone>(
    array: &ArrayD<A>,
    axes: Range<usize>,
) -> Result<ArrayD<A>, SpectralError> {
    roll(array, axes, |n| n - n / 2)
}
