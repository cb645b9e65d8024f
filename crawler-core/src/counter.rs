//! Process-local crawl statistics, ported from the teacher's
//! `crawler/counter.rs` near-verbatim. Used by both the Coordinator (run
//! totals) and each Worker (per-process tallies surfaced in logs).

use serde_derive::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Counter {
    open_count: AtomicUsize,
    closed_count: AtomicUsize,
    error_count: AtomicUsize,
    download_count: AtomicUsize,
}

impl Counter {
    pub fn register_open(&self) {
        self.open_count.fetch_add(1, Ordering::Release);
    }

    pub fn register_closed(&self) {
        self.closed_count.fetch_add(1, Ordering::Release);
    }

    pub fn register_error(&self) {
        self.register_closed();
        self.error_count.fetch_add(1, Ordering::Release);
    }

    pub fn add_to_download_count(&self, amount: usize) {
        self.download_count.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn n_closed(&self) -> usize {
        self.closed_count.load(Ordering::Acquire)
    }

    pub fn n_error(&self) -> usize {
        self.error_count.load(Ordering::Acquire)
    }

    pub fn n_active(&self) -> usize {
        self.open_count.load(Ordering::Acquire) - self.closed_count.load(Ordering::Acquire)
    }

    pub fn n_downloaded(&self) -> usize {
        self.download_count.load(Ordering::Relaxed)
    }

    pub fn merge(&self, other: &Self) -> Self {
        Counter {
            open_count: AtomicUsize::new(
                self.open_count.load(Ordering::Acquire) + other.open_count.load(Ordering::Acquire),
            ),
            closed_count: AtomicUsize::new(
                self.closed_count.load(Ordering::Acquire)
                    + other.closed_count.load(Ordering::Acquire),
            ),
            error_count: AtomicUsize::new(
                self.error_count.load(Ordering::Acquire)
                    + other.error_count.load(Ordering::Acquire),
            ),
            download_count: AtomicUsize::new(
                self.download_count.load(Ordering::Acquire)
                    + other.download_count.load(Ordering::Acquire),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_active_tracks_open_minus_closed() {
        let counter = Counter::default();
        counter.register_open();
        counter.register_open();
        assert_eq!(counter.n_active(), 2);
        counter.register_closed();
        assert_eq!(counter.n_active(), 1);
    }

    #[test]
    fn register_error_also_closes() {
        let counter = Counter::default();
        counter.register_open();
        counter.register_error();
        assert_eq!(counter.n_closed(), 1);
        assert_eq!(counter.n_error(), 1);
    }

    #[test]
    fn merge_sums_both_sides() {
        let a = Counter::default();
        a.register_open();
        a.register_closed();
        let b = Counter::default();
        b.register_open();

        let merged = a.merge(&b);
        assert_eq!(merged.n_closed(), 1);
        assert_eq!(merged.n_active(), 1);
    }
}
