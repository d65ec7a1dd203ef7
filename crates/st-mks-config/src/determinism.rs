// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::sync::OnceLock;

use rand::{rngs::StdRng, SeedableRng};

pub(crate) const ENABLED_ENV: &str = "MKS_DETERMINISTIC";
pub(crate) const SEED_ENV: &str = "MKS_DETERMINISTIC_SEED";
pub(crate) const REDUCTION_ENV: &str = "MKS_DETERMINISTIC_REDUCTION";

const DEFAULT_SEED: u64 = 42;

/// Reproducibility switches for calibration runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterminismConfig {
    /// Seeded generators instead of OS entropy.
    pub enabled: bool,
    /// Root of every derived seed.
    pub base_seed: u64,
    /// Per-bin solves and lane transforms stay on one worker so summation
    /// order is identical between runs.
    pub serial_reduction: bool,
}

impl Default for DeterminismConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_seed: DEFAULT_SEED,
            serial_reduction: false,
        }
    }
}

impl DeterminismConfig {
    /// Builds a snapshot from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a snapshot from an arbitrary variable source.
    ///
    /// Unrecognised flag values are ignored. The reduction switch follows
    /// `enabled` unless set explicitly.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = match lookup(ENABLED_ENV) {
            // any value other than an explicit "off" turns it on
            Some(raw) => parse_flag(&raw).unwrap_or(true),
            None => false,
        };
        let base_seed = lookup(SEED_ENV)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SEED);
        let serial_reduction = lookup(REDUCTION_ENV)
            .and_then(|raw| parse_flag(&raw))
            .unwrap_or(enabled);
        Self {
            enabled,
            base_seed,
            serial_reduction,
        }
    }

    /// Stable seed for a named component, independent of the Rust version.
    pub fn seed_for(&self, label: &str) -> u64 {
        label
            .bytes()
            .fold(splitmix64(self.base_seed), |acc, byte| {
                splitmix64(acc ^ u64::from(byte))
            })
    }

    /// Generator for a named component: seeded when enabled, entropy otherwise.
    pub fn rng_for(&self, label: &str) -> StdRng {
        if self.enabled {
            StdRng::seed_from_u64(self.seed_for(label))
        } else {
            StdRng::from_entropy()
        }
    }
}

/// `Some(true)` / `Some(false)` for the usual on/off spellings.
pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

static CONFIG: OnceLock<DeterminismConfig> = OnceLock::new();

/// Process-wide snapshot, read from the environment on first use.
pub fn config() -> &'static DeterminismConfig {
    CONFIG.get_or_init(DeterminismConfig::from_env)
}

/// Generator for `label` under the process-wide configuration.
pub fn rng_from_label(label: &str) -> StdRng {
    config().rng_for(label)
}

/// An explicit seed always wins; otherwise defers to [`rng_from_label`].
pub fn rng_from_optional(seed: Option<u64>, label: &str) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => rng_from_label(label),
    }
}

/// True when parallel reductions must collapse to a single worker.
pub fn lock_reduction_order() -> bool {
    let cfg = config();
    cfg.enabled && cfg.serial_reduction
}
