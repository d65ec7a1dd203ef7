// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Process-wide configuration for the MKS localization crates: reproducible
//! seeding, worker-count defaults, and the tracing subscriber.

pub mod determinism;
pub mod parallel;
pub mod tracing;

pub use determinism::{rng_from_label, rng_from_optional, DeterminismConfig};
pub use parallel::{default_jobs, jobs_for, ParallelConfig};
pub use self::tracing::{flush_chrome_trace, init_tracing, InitError};
