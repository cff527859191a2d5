use std::num::NonZeroUsize;
use std::ops::Range;

use crate::WorkerIndex;

/// Contiguous half-open range `[start, end)` of the pending job list owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    pub worker: WorkerIndex,
    pub start: usize,
    pub end: usize,
}

impl Shard {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The jobs of `items` covered by this shard.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.range()]
    }
}

/// Splits `job_count` items into `worker_count` shards of `ceil(job_count / worker_count)`.
///
/// Shard `i` (1-based) covers `[(i - 1) * size, i * size)` clipped to `job_count`,
/// so trailing shards may be empty.
pub fn partition(job_count: usize, worker_count: NonZeroUsize) -> Vec<Shard> {
    let workers = worker_count.get();
    let shard_size = job_count.div_ceil(workers);

    (1..=workers)
        .map(|worker| {
            let start = (worker - 1).saturating_mul(shard_size).min(job_count);
            let end = worker.saturating_mul(shard_size).min(job_count);
            Shard { worker, start, end }
        })
        .collect()
}
