// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

use crate::basis::BasisDescriptor;

/// Shape violations detected before any computation starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("shape of y is incorrect: expected rank > 1, got rank {rank}")]
    ResponseRank { rank: usize },
    #[error("at least one sample is required")]
    NoSamples,
    #[error("X and y must be the same shape (X={x:?}, y={y:?})")]
    Mismatch { x: Vec<usize>, y: Vec<usize> },
    #[error("cannot reshape array of shape {from:?} into {to:?}")]
    Reshape { from: Vec<usize>, to: Vec<usize> },
}

/// Errors raised by basis construction and discretization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BasisError {
    #[error("a basis needs at least one local state")]
    NoStates,
    #[error("domain must satisfy low < high (low={low}, high={high})")]
    InvalidDomain { low: f64, high: f64 },
    #[error("field values [{min}, {max}] must lie within the domain [{low}, {high}]")]
    OutOfDomain {
        min: f64,
        max: f64,
        low: f64,
        high: f64,
    },
    #[error("field contains non-finite values")]
    NonFinite,
    #[error("field must have at least one axis")]
    Scalar,
}

/// Errors raised by the multidimensional transforms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpectralError {
    #[error("transform axes {start}..{end} out of range for rank {rank}")]
    AxisRange {
        start: usize,
        end: usize,
        rank: usize,
    },
    #[error("transform axis {axis} is empty")]
    EmptyAxis { axis: usize },
    #[error("output shape rank {expected} does not match spectrum rank {actual}")]
    ShapeRank { expected: usize, actual: usize },
    #[error("axis {axis} holds {actual} bins but an output length of {len} implies {expected}")]
    HalfSpectrum {
        axis: usize,
        len: usize,
        expected: usize,
        actual: usize,
    },
}

/// Errors raised by the frequency-domain filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("kernel shape {actual:?} is incompatible with expected {expected:?}")]
    KernelShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("dimensions of X are incorrect: {actual:?} cannot be convolved with kernel {kernel:?}")]
    Dimensions {
        kernel: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("resize shape has {actual} axes but the kernel has {expected} spatial axes")]
    ResizeRank { expected: usize, actual: usize },
    #[error("resize shape {size:?} contains an empty axis")]
    EmptyAxis { size: Vec<usize> },
    #[error(transparent)]
    Spectral(#[from] SpectralError),
}

/// Top-level error for the localization model.
#[derive(Debug, Error)]
pub enum MksError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Basis(#[from] BasisError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Spectral(#[from] SpectralError),
    #[error("fit must be run before predict")]
    NotFitted,
    #[error("least-squares solve failed at frequency bin {bin:?}: {reason}")]
    Solve { bin: Vec<usize>, reason: String },
    #[error("filter was built for a {filter} but the model discretizes with a {model}")]
    BasisMismatch {
        model: BasisDescriptor,
        filter: BasisDescriptor,
    },
}

pub type MksResult<T> = Result<T, MksError>;
