// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Local-state bases that expand a raw microstructure field into per-state
//! weights.
//!
//! A basis is described by a plain [`BasisDescriptor`] value and built through
//! [`build_basis`]. The localization model keeps only the descriptor around
//! and rebuilds the basis on every fit, so nothing a caller constructed is
//! ever mutated.
//!
//! Every basis also decides which local-state columns are linearly
//! independent at a given frequency bin. That policy lives in small pure
//! functions ([`primitive_subset_for_bin`], [`full_subset_for_bin`]) so the
//! least-squares core never needs to know which basis produced the columns.

mod legendre;
mod primitive;

use std::fmt;
use std::ops::Range;

use ndarray::{ArrayD, ArrayViewD};

use crate::error::BasisError;

pub use legendre::LegendreBasis;
pub use primitive::PrimitiveBasis;

/// Closed value range a basis discretizes over.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Domain {
    pub low: f64,
    pub high: f64,
}

impl Domain {
    pub fn new(low: f64, high: f64) -> Result<Self, BasisError> {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(BasisError::InvalidDomain { low, high });
        }
        Ok(Self { low, high })
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    /// Rejects fields with non-finite values or values outside the domain.
    pub(crate) fn check(&self, field: &ArrayViewD<'_, f64>) -> Result<(), BasisError> {
        if field.iter().any(|v| !v.is_finite()) {
            return Err(BasisError::NonFinite);
        }
        let (min, max) = field
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min < self.low || max > self.high {
            return Err(BasisError::OutOfDomain {
                min,
                max,
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }
}

/// Family of a basis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BasisKind {
    /// Hat-function (indicator) basis over evenly spaced local states.
    Primitive,
    /// Normalised Legendre polynomials of increasing order.
    Legendre,
}

impl BasisKind {
    /// Domain used when the caller does not pick one.
    pub fn default_domain(self, n_states: usize) -> Domain {
        match self {
            BasisKind::Primitive => Domain {
                low: 0.0,
                high: n_states.saturating_sub(1).max(1) as f64,
            },
            BasisKind::Legendre => Domain {
                low: -1.0,
                high: 1.0,
            },
        }
    }

    /// Independent local-state columns at `bin` for this basis family.
    pub fn subset_for_bin(self, bin: &[usize], n_states: usize) -> Range<usize> {
        match self {
            BasisKind::Primitive => primitive_subset_for_bin(bin, n_states),
            BasisKind::Legendre => full_subset_for_bin(bin, n_states),
        }
    }
}

impl fmt::Display for BasisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasisKind::Primitive => f.write_str("primitive"),
            BasisKind::Legendre => f.write_str("legendre"),
        }
    }
}

/// Everything needed to (re)build a basis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BasisDescriptor {
    pub kind: BasisKind,
    pub n_states: usize,
    pub domain: Domain,
}

impl BasisDescriptor {
    /// Describes a basis, falling back to the family's default domain.
    pub fn new(
        kind: BasisKind,
        n_states: usize,
        domain: Option<(f64, f64)>,
    ) -> Result<Self, BasisError> {
        if n_states == 0 {
            return Err(BasisError::NoStates);
        }
        let domain = match domain {
            Some((low, high)) => Domain::new(low, high)?,
            None => kind.default_domain(n_states),
        };
        Ok(Self {
            kind,
            n_states,
            domain,
        })
    }

    pub fn primitive(n_states: usize, domain: Option<(f64, f64)>) -> Result<Self, BasisError> {
        Self::new(BasisKind::Primitive, n_states, domain)
    }

    pub fn legendre(n_states: usize, domain: Option<(f64, f64)>) -> Result<Self, BasisError> {
        Self::new(BasisKind::Legendre, n_states, domain)
    }

    /// Same family and domain with a different number of local states.
    pub fn with_states(self, n_states: usize) -> Result<Self, BasisError> {
        if n_states == 0 {
            return Err(BasisError::NoStates);
        }
        Ok(Self { n_states, ..self })
    }
}

impl fmt::Display for BasisDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} basis with {} states on [{}, {}]",
            self.kind, self.n_states, self.domain.low, self.domain.high
        )
    }
}

/// Contract every microstructure basis fulfils.
pub trait LocalStateBasis: fmt::Debug + Send + Sync {
    fn descriptor(&self) -> BasisDescriptor;

    fn n_states(&self) -> usize {
        self.descriptor().n_states
    }

    fn domain(&self) -> Domain {
        self.descriptor().domain
    }

    /// Appends a trailing local-state axis of width `n_states` to `field`.
    fn discretize(&self, field: ArrayViewD<'_, f64>) -> Result<ArrayD<f64>, BasisError>;

    /// Local-state columns that are linearly independent at `bin`.
    fn independent_subset(&self, bin: &[usize]) -> Range<usize> {
        let descriptor = self.descriptor();
        descriptor.kind.subset_for_bin(bin, descriptor.n_states)
    }
}

/// Builds a fresh basis from its descriptor.
pub fn build_basis(descriptor: &BasisDescriptor) -> Result<Box<dyn LocalStateBasis>, BasisError> {
    if descriptor.n_states == 0 {
        return Err(BasisError::NoStates);
    }
    let domain = Domain::new(descriptor.domain.low, descriptor.domain.high)?;
    Ok(match descriptor.kind {
        BasisKind::Primitive => Box::new(PrimitiveBasis::new(descriptor.n_states, domain)),
        BasisKind::Legendre => Box::new(LegendreBasis::new(descriptor.n_states, domain)),
    })
}

/// Indicator channels sum to a constant, so away from the zero bin their
/// transforms are linearly dependent and the last state is dropped.
pub fn primitive_subset_for_bin(bin: &[usize], n_states: usize) -> Range<usize> {
    if bin.iter().all(|&index| index == 0) {
        0..n_states
    } else {
        0..n_states.saturating_sub(1)
    }
}

/// Every column is independent at every bin.
pub fn full_subset_for_bin(_bin: &[usize], n_states: usize) -> Range<usize> {
    0..n_states
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_domains_follow_family() {
        let prim = BasisDescriptor::primitive(5, None).unwrap();
        assert_eq!(prim.domain, Domain { low: 0.0, high: 4.0 });
        let leg = BasisDescriptor::legendre(3, None).unwrap();
        assert_eq!(leg.domain, Domain { low: -1.0, high: 1.0 });
    }

    #[test]
    fn descriptor_display_names_every_field() {
        let leg = BasisDescriptor::legendre(3, Some((0.0, 1.0))).unwrap();
        assert_eq!(leg.to_string(), "legendre basis with 3 states on [0, 1]");
    }

    #[test]
    fn invalid_descriptors_are_rejected() {
        assert_eq!(
            BasisDescriptor::primitive(0, None).unwrap_err(),
            BasisError::NoStates
        );
        assert!(matches!(
            BasisDescriptor::primitive(2, Some((1.0, 1.0))),
            Err(BasisError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn primitive_subset_keeps_all_states_only_at_zero_bin() {
        assert_eq!(primitive_subset_for_bin(&[0, 0], 3), 0..3);
        assert_eq!(primitive_subset_for_bin(&[0, 1], 3), 0..2);
        assert_eq!(primitive_subset_for_bin(&[2], 1), 0..0);
        assert_eq!(full_subset_for_bin(&[4, 1], 3), 0..3);
    }

    #[test]
    fn factory_builds_requested_family() {
        let descriptor = BasisDescriptor::legendre(4, Some((0.0, 1.0))).unwrap();
        let basis = build_basis(&descriptor).unwrap();
        assert_eq!(basis.descriptor(), descriptor);
        assert_eq!(basis.independent_subset(&[1]), 0..4);

        let descriptor = BasisDescriptor::primitive(4, Some((0.0, 1.0))).unwrap();
        let basis = build_basis(&descriptor).unwrap();
        assert_eq!(basis.independent_subset(&[1]), 0..3);
    }
}
