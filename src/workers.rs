use anyhow::{anyhow, Context};
use rayon::prelude::*;

/// Bounded pool for per-entity work. Tasks run as a batch: every task
/// finishes before the first failure (in input order) is reported.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// `threads == 0` lets rayon pick one worker per core.
    pub fn new(threads: usize) -> anyhow::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("mapping-worker-{i}"))
            .build()
            .context("build worker pool")?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `f` over `items` and returns results in input order.
    pub fn scatter_gather<T, R, F>(&self, items: &[T], f: F) -> anyhow::Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> anyhow::Result<R> + Sync + Send,
    {
        let results: Vec<anyhow::Result<R>> =
            self.pool.install(|| items.par_iter().map(&f).collect());

        let failures = results.iter().filter(|r| r.is_err()).count();
        if failures == 0 {
            return Ok(results.into_iter().flatten().collect());
        }
        let total = results.len();
        let first = results
            .into_iter()
            .find_map(Result::err)
            .unwrap_or_else(|| anyhow!("task failed"));
        Err(first.context(format!("{failures} of {total} tasks failed")))
    }
}
