// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use nalgebra::{DMatrix, DVector, SVD};
use num_complex::Complex64;

/// Minimum-norm least-squares solution of `a · k = b` over complex data.
///
/// Singular values below `σ_max · ε · max(rows, cols)` are treated as zero,
/// the same cutoff LAPACK's `gelsd` uses by default.
pub(crate) fn solve_least_squares(
    a: DMatrix<Complex64>,
    b: &DVector<Complex64>,
) -> Result<DVector<Complex64>, &'static str> {
    let (rows, cols) = a.shape();
    let svd = SVD::new(a, true, true);
    let largest = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    let cutoff = largest * f64::EPSILON * rows.max(cols) as f64;
    svd.solve(b, cutoff)
}
