// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::{debug, warn};

static POOLS: OnceLock<Mutex<HashMap<usize, Arc<ThreadPool>>>> = OnceLock::new();

/// Shared pool with `jobs` workers, built on first request and reused by
/// every later transform and solve asking for the same width.
fn pool_for(jobs: usize) -> Result<Arc<ThreadPool>, ThreadPoolBuildError> {
    let jobs = jobs.max(1);
    let mut pools = POOLS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(pool) = pools.get(&jobs) {
        return Ok(Arc::clone(pool));
    }
    let pool = Arc::new(
        ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(move |index| format!("st-mks-{jobs}-{index}"))
            .build()?,
    );
    debug!(target: "st_mks::parallel", jobs, "built worker pool");
    pools.insert(jobs, Arc::clone(&pool));
    Ok(pool)
}

/// Runs `op` inside the pool sized to `jobs` workers.
///
/// If the pool cannot be created, `op` still runs and any parallel iterators
/// inside it land on the global rayon pool.
pub(crate) fn install<R, F>(jobs: usize, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match pool_for(jobs) {
        Ok(pool) => pool.install(op),
        Err(err) => {
            warn!(
                target: "st_mks::parallel",
                jobs,
                error = %err,
                "dedicated thread pool unavailable; using the global pool"
            );
            op()
        }
    }
}
