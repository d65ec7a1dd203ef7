// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

// crates/st-mks/src/lib.rs
//! Materials Knowledge System localization: learn influence coefficients that
//! map a discretized microstructure to its local response, then predict
//! responses for new microstructures.

pub mod basis;
pub mod error;
pub mod filter;
pub mod localization;
pub mod reshape;
pub mod spectral;
pub mod synth;

mod lstsq;
mod parallel;

pub use basis::{
    build_basis, BasisDescriptor, BasisKind, Domain, LegendreBasis, LocalStateBasis,
    PrimitiveBasis,
};
pub use error::{BasisError, FilterError, MksError, MksResult, ShapeError, SpectralError};
pub use filter::Filter;
pub use localization::LocalizationModel;
pub use reshape::reshape_feature;
