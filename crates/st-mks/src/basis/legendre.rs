// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};

use super::{BasisDescriptor, BasisKind, Domain, LocalStateBasis};
use crate::error::BasisError;

/// Legendre polynomial basis. Local state `l` carries `(2l + 1) / 2 · P_l(t)`
/// where `t` is the field value mapped affinely from the domain onto `[-1, 1]`.
#[derive(Clone, Debug)]
pub struct LegendreBasis {
    n_states: usize,
    domain: Domain,
}

impl LegendreBasis {
    pub fn new(n_states: usize, domain: Domain) -> Self {
        Self { n_states, domain }
    }

    /// Normalised `P_0..P_{n-1}` at `t` via the three-term recurrence.
    fn weights_at(&self, t: f64, out: &mut [f64]) {
        let mut prev = 0.0;
        let mut current = 1.0;
        for (order, slot) in out.iter_mut().enumerate() {
            let l = order as f64;
            *slot = (2.0 * l + 1.0) / 2.0 * current;
            let next = ((2.0 * l + 1.0) * t * current - l * prev) / (l + 1.0);
            prev = current;
            current = next;
        }
    }
}

impl LocalStateBasis for LegendreBasis {
    fn descriptor(&self) -> BasisDescriptor {
        BasisDescriptor {
            kind: BasisKind::Legendre,
            n_states: self.n_states,
            domain: self.domain,
        }
    }

    fn discretize(&self, field: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, BasisError> {
        if field.ndim() == 0 {
            return Err(BasisError::Scalar);
        }
        self.domain.check(&field)?;

        let Domain { low, high } = self.domain;
        let mut shape = field.shape().to_vec();
        shape.push(self.n_states);
        let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
        let mut weights = vec![0.0; self.n_states];
        for (&x, mut lane) in field
            .iter()
            .zip(out.lanes_mut(Axis(field.ndim())).into_iter())
        {
            let t = (2.0 * x - low - high) / (high - low);
            self.weights_at(t, &mut weights);
            for (dst, &w) in lane.iter_mut().zip(&weights) {
                *dst = w;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::rfftn;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn recurrence_matches_closed_forms() {
        let basis = LegendreBasis::new(4, Domain::new(-1.0, 1.0).unwrap());
        let xd = basis.discretize(array![[0.5]].into_dyn().view()).unwrap();
        // P0 = 1, P1 = t, P2 = (3t² - 1) / 2, P3 = (5t³ - 3t) / 2
        let expected = [0.5, 1.5 * 0.5, 2.5 * -0.125, 3.5 * -0.4375];
        for (s, value) in expected.iter().enumerate() {
            assert_abs_diff_eq!(xd[[0, 0, s]], *value, epsilon = 1e-12);
        }
    }

    #[test]
    fn constant_channel_transforms_to_zero_bin_only() {
        let basis = LegendreBasis::new(2, Domain::new(0.0, 1.0).unwrap());
        let x = array![[[0.55, 0.71, 0.29], [0.51, 0.89, 0.90], [0.13, 0.21, 0.05]]].into_dyn();
        let xd = basis.discretize(x.view()).unwrap();
        let fx = rfftn(&xd, 1..3, 1).unwrap();
        assert_eq!(fx.shape(), &[1, 3, 2, 2]);
        assert_abs_diff_eq!(fx[[0, 0, 0, 0]].re, 4.5, epsilon = 1e-12);
        for i in 0..3 {
            for j in 0..2 {
                if (i, j) != (0, 0) {
                    assert_abs_diff_eq!(fx[[0, i, j, 0]].norm(), 0.0, epsilon = 1e-12);
                }
            }
        }
        let mapped: f64 = x.iter().map(|&v| 2.0 * v - 1.0).sum();
        assert_abs_diff_eq!(fx[[0, 0, 0, 1]].re, 1.5 * mapped, epsilon = 1e-12);
    }

    #[test]
    fn rejects_values_outside_domain() {
        let basis = LegendreBasis::new(3, Domain::new(0.0, 1.0).unwrap());
        let err = basis
            .discretize(array![[-0.1, 0.4]].into_dyn().view())
            .unwrap_err();
        assert!(matches!(err, BasisError::OutOfDomain { .. }));
    }
}
