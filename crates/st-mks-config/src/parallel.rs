// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::sync::OnceLock;

use crate::determinism::{self, DeterminismConfig};

pub(crate) const JOBS_ENV: &str = "MKS_JOBS";

/// Worker-count defaults for transforms and per-bin solves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Workers handed to models built without an explicit job count. Never 0.
    pub jobs: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

impl ParallelConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads `MKS_JOBS` from `lookup`; zero or unparseable means one worker.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let jobs = lookup(JOBS_ENV)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|&jobs| jobs > 0)
            .unwrap_or(1);
        Self { jobs }
    }
}

static CONFIG: OnceLock<ParallelConfig> = OnceLock::new();

pub fn config() -> &'static ParallelConfig {
    CONFIG.get_or_init(ParallelConfig::from_env)
}

/// Job count implied by a pair of snapshots; one whenever reduction order
/// is locked.
pub fn jobs_for(determinism: &DeterminismConfig, parallel: &ParallelConfig) -> usize {
    if determinism.enabled && determinism.serial_reduction {
        1
    } else {
        parallel.jobs.max(1)
    }
}

/// Job count new models start with, from the process-wide snapshots.
pub fn default_jobs() -> usize {
    jobs_for(determinism::config(), config())
}
