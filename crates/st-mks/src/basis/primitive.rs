// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};

use super::{BasisDescriptor, BasisKind, Domain, LocalStateBasis};
use crate::error::BasisError;

/// Hat-function basis: `n_states` evenly spaced local states `H_i` across the
/// domain, with each value split linearly between its two nearest states.
#[derive(Clone, Debug)]
pub struct PrimitiveBasis {
    n_states: usize,
    domain: Domain,
    states: Vec<f64>,
}

impl PrimitiveBasis {
    pub fn new(n_states: usize, domain: Domain) -> Self {
        let states = if n_states == 1 {
            vec![domain.low]
        } else {
            let step = domain.width() / (n_states - 1) as f64;
            (0..n_states)
                .map(|i| domain.low + step * i as f64)
                .collect()
        };
        Self {
            n_states,
            domain,
            states,
        }
    }

    /// Local-state values `H_i`.
    pub fn states(&self) -> &[f64] {
        &self.states
    }
}

impl LocalStateBasis for PrimitiveBasis {
    fn descriptor(&self) -> BasisDescriptor {
        BasisDescriptor {
            kind: BasisKind::Primitive,
            n_states: self.n_states,
            domain: self.domain,
        }
    }

    fn discretize(&self, field: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, BasisError> {
        if field.ndim() == 0 {
            return Err(BasisError::Scalar);
        }
        self.domain.check(&field)?;
        let axis = Axis(field.ndim());
        if self.n_states == 1 {
            return Ok(field.mapv(|_| 1.0).insert_axis(axis));
        }

        let spacing = self.states[1] - self.states[0];
        let mut shape = field.shape().to_vec();
        shape.push(self.n_states);
        let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
        for (&state, mut channel) in self.states.iter().zip(out.axis_iter_mut(axis)) {
            channel.zip_mut_with(&field, |w, &x| {
                *w = (1.0 - (x - state).abs() / spacing).max(0.0);
            });
        }
        Ok(out)
    }
}
