//! Progress aggregation across concurrent part uploads

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Callback receiving the overall percentage (0..=100)
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Shared counter of completed parts for one upload session
///
/// `completed` only grows and never passes `total`, so [`percentage`] is
/// non-decreasing. Callback delivery is serialized and only fires when the
/// percentage grew, so observers see a strictly increasing sequence even when
/// completions race.
///
/// [`percentage`]: ProgressAggregator::percentage
pub struct ProgressAggregator {
    completed: AtomicUsize,
    total: usize,
    last_reported: Mutex<Option<u8>>,
    callback: Option<ProgressFn>,
}

impl ProgressAggregator {
    pub fn new(total: usize, callback: Option<ProgressFn>) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
            last_reported: Mutex::new(None),
            callback,
        }
    }

    /// Record one finished part and notify the callback if the percentage moved
    pub fn on_part_complete(&self) {
        let total = self.total;
        let previous = self
            .completed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |done| {
                (done < total).then_some(done + 1)
            });

        if previous.is_err() {
            tracing::warn!(total, "progress completion past total ignored");
            return;
        }

        self.report();
    }

    /// Mark everything complete (used by the single-request path)
    pub fn finish(&self) {
        self.completed.store(self.total, Ordering::Release);
        self.report();
    }

    pub fn completed_parts(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn total_parts(&self) -> usize {
        self.total
    }

    /// `floor(completed / total * 100)`; an empty total counts as done
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let done = self.completed_parts().min(self.total);
        (done * 100 / self.total) as u8
    }

    fn report(&self) {
        let Some(callback) = &self.callback else {
            return;
        };

        // Read the counter under the lock so a slower reporter can never
        // deliver an older value after a newer one.
        let mut last = match self.last_reported.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let current = self.percentage();
        if last.is_none_or(|prev| current > prev) {
            *last = Some(current);
            callback(current);
        }
    }
}

impl std::fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressAggregator")
            .field("completed", &self.completed_parts())
            .field("total", &self.total)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (ProgressFn, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressFn = Arc::new(move |pct: u8| sink.lock().unwrap().push(pct));
        (callback, seen)
    }

    #[test]
    fn test_percentage_floors() {
        let progress = ProgressAggregator::new(3, None);
        assert_eq!(progress.percentage(), 0);
        progress.on_part_complete();
        assert_eq!(progress.percentage(), 33);
        progress.on_part_complete();
        assert_eq!(progress.percentage(), 66);
        progress.on_part_complete();
        assert_eq!(progress.percentage(), 100);
    }

    #[test]
    fn test_never_exceeds_total() {
        let progress = ProgressAggregator::new(2, None);
        for _ in 0..5 {
            progress.on_part_complete();
        }
        assert_eq!(progress.completed_parts(), 2);
        assert_eq!(progress.percentage(), 100);
    }

    #[test]
    fn test_callback_sequence() {
        let (callback, seen) = recorder();
        let progress = ProgressAggregator::new(4, Some(callback));
        for _ in 0..4 {
            progress.on_part_complete();
        }
        assert_eq!(*seen.lock().unwrap(), vec![25, 50, 75, 100]);
    }

    #[test]
    fn test_callback_skips_unchanged_percentage() {
        let (callback, seen) = recorder();
        let progress = ProgressAggregator::new(300, Some(callback));
        for _ in 0..6 {
            progress.on_part_complete();
        }
        // 1/300 and 2/300 floor to 0, 3/300 is 1%, 6/300 is 2%
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_finish_reports_hundred() {
        let (callback, seen) = recorder();
        let progress = ProgressAggregator::new(1, Some(callback));
        progress.finish();
        assert_eq!(progress.percentage(), 100);
        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }

    #[test]
    fn test_concurrent_completions_are_counted_and_monotonic() {
        let (callback, seen) = recorder();
        let progress = Arc::new(ProgressAggregator::new(64, Some(callback)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let progress = progress.clone();
                std::thread::spawn(move || {
                    for _ in 0..8 {
                        progress.on_part_complete();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(progress.completed_parts(), 64);
        assert_eq!(progress.percentage(), 100);

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "not increasing: {seen:?}");
        assert_eq!(seen.last(), Some(&100));
    }
}
