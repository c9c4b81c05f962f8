//! Deterministic range partition of a task domain between workers.
//!
//! Frame work (scanlines, tiles) is split so that every worker computes
//! its own share from `(worker, num_workers, num_tasks)` alone, with no
//! coordination. Leading workers absorb the remainder.

use std::ops::Range;

use crate::id::WorkerIdx;

/// The half-open task range assigned to `worker`.
///
/// With `q = num_tasks / num_workers` and `r = num_tasks % num_workers`,
/// the first `r` workers receive `q + 1` tasks and the rest receive `q`.
/// The ranges of all workers are pairwise disjoint, ordered by worker
/// index, and exactly cover `0..num_tasks`.
///
/// A zero `num_workers`, or a `worker` outside `0..num_workers`, yields an
/// empty range.
pub fn task_range(worker: WorkerIdx, num_workers: u32, num_tasks: u32) -> Range<u32> {
    if num_workers == 0 || worker.0 >= num_workers {
        return 0..0;
    }
    let per_worker = num_tasks / num_workers;
    let remainder = num_tasks % num_workers;
    let idx = worker.0;
    let start = if idx < remainder {
        idx * (per_worker + 1)
    } else {
        num_tasks - (num_workers - idx) * per_worker
    };
    let len = per_worker + u32::from(idx < remainder);
    start..start + len
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn even_split() {
        let ranges: Vec<_> = (0..4).map(|w| task_range(WorkerIdx(w), 4, 8)).collect();
        assert_eq!(ranges, vec![0..2, 2..4, 4..6, 6..8]);
    }

    #[test]
    fn remainder_goes_to_leading_workers() {
        let ranges: Vec<_> = (0..3).map(|w| task_range(WorkerIdx(w), 3, 10)).collect();
        assert_eq!(ranges, vec![0..4, 4..7, 7..10]);
    }

    #[test]
    fn more_workers_than_tasks() {
        let ranges: Vec<_> = (0..5).map(|w| task_range(WorkerIdx(w), 5, 2)).collect();
        assert_eq!(ranges, vec![0..1, 1..2, 2..2, 2..2, 2..2]);
    }

    #[test]
    fn zero_tasks_is_empty_everywhere() {
        for w in 0..3 {
            assert!(task_range(WorkerIdx(w), 3, 0).is_empty());
        }
    }

    #[test]
    fn out_of_range_worker_is_empty() {
        assert!(task_range(WorkerIdx(4), 4, 100).is_empty());
        assert!(task_range(WorkerIdx(0), 0, 100).is_empty());
    }

    proptest! {
        #[test]
        fn partitions_are_disjoint_and_cover(
            num_workers in 1u32..64,
            num_tasks in 0u32..10_000,
        ) {
            let mut next = 0;
            let mut min_len = u32::MAX;
            let mut max_len = 0;
            for w in 0..num_workers {
                let r = task_range(WorkerIdx(w), num_workers, num_tasks);
                // Contiguous and ordered implies disjoint.
                prop_assert_eq!(r.start, next);
                next = r.end;
                min_len = min_len.min(r.len() as u32);
                max_len = max_len.max(r.len() as u32);
            }
            prop_assert_eq!(next, num_tasks);
            prop_assert!(max_len - min_len <= 1);
        }

        #[test]
        fn leading_workers_get_ceiling(
            num_workers in 1u32..64,
            num_tasks in 0u32..10_000,
        ) {
            let remainder = num_tasks % num_workers;
            for w in 0..num_workers {
                let len = task_range(WorkerIdx(w), num_workers, num_tasks).len() as u32;
                if w < remainder {
                    prop_assert_eq!(len, num_tasks.div_ceil(num_workers));
                } else {
                    prop_assert_eq!(len, num_tasks / num_workers);
                }
            }
        }
    }
}
