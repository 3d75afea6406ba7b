//! Run-time feedback for the adaptive collector variants.
//!
//! The adaptive size policy tracks the eden, promotion and survivor sizes the collector is
//! working with, a decaying average of the fraction of time spent collecting, and whether the
//! collector is spending so much time for so little free memory that allocation should give up
//! (the GC overhead limit).

use crate::util::conversions::bytes_to_formatted_string;
use crate::util::options::Options;
use atomic::Atomic;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Weight, in percent, of the newest sample in the decaying GC cost average.
const ADAPTIVE_SIZE_POLICY_WEIGHT: f64 = 10.0;

/// When the overhead limit is reported.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OverheadLimits {
    /// Percentage of time spent in GC above which a collection counts against the limit.
    pub gc_time_limit: usize,
    /// Percentage of the heap free after a full collection below which a collection counts.
    pub gc_heap_free_limit: usize,
    /// Number of consecutive counted collections before the limit is reported.
    pub threshold: usize,
    /// Whether to count at all.
    pub enabled: bool,
}

impl OverheadLimits {
    pub fn from_options(options: &Options) -> Self {
        OverheadLimits {
            gc_time_limit: *options.gc_time_limit,
            gc_heap_free_limit: *options.gc_heap_free_limit,
            threshold: *options.gc_overhead_limit_threshold,
            enabled: *options.use_gc_overhead_limit,
        }
    }
}

pub struct AdaptiveSizePolicy {
    eden_size: AtomicUsize,
    promo_size: AtomicUsize,
    survivor_size: AtomicUsize,
    gc_time_ratio: usize,
    limits: OverheadLimits,
    /// Decaying average of the fraction of time spent in GC, in `[0, 1]`.
    avg_gc_cost: Atomic<f64>,
    overhead_limit_count: AtomicUsize,
    overhead_limit_exceeded: AtomicBool,
    collections: AtomicUsize,
}

impl AdaptiveSizePolicy {
    pub fn new(
        init_eden_size: usize,
        init_promo_size: usize,
        init_survivor_size: usize,
        gc_time_ratio: usize,
        limits: OverheadLimits,
    ) -> Self {
        debug!(
            "Adaptive size policy: eden {}, promo {}, survivor {}, gc time ratio {}",
            bytes_to_formatted_string(init_eden_size),
            bytes_to_formatted_string(init_promo_size),
            bytes_to_formatted_string(init_survivor_size),
            gc_time_ratio
        );
        AdaptiveSizePolicy {
            eden_size: AtomicUsize::new(init_eden_size),
            promo_size: AtomicUsize::new(init_promo_size),
            survivor_size: AtomicUsize::new(init_survivor_size),
            gc_time_ratio,
            limits,
            avg_gc_cost: Atomic::new(0.0),
            overhead_limit_count: AtomicUsize::new(0),
            overhead_limit_exceeded: AtomicBool::new(false),
            collections: AtomicUsize::new(0),
        }
    }

    pub fn eden_size(&self) -> usize {
        self.eden_size.load(Ordering::Relaxed)
    }

    pub fn promo_size(&self) -> usize {
        self.promo_size.load(Ordering::Relaxed)
    }

    pub fn survivor_size(&self) -> usize {
        self.survivor_size.load(Ordering::Relaxed)
    }

    pub fn set_eden_size(&self, size: usize) {
        self.eden_size.store(size, Ordering::Relaxed);
    }

    pub fn set_promo_size(&self, size: usize) {
        self.promo_size.store(size, Ordering::Relaxed);
    }

    pub fn set_survivor_size(&self, size: usize) {
        self.survivor_size.store(size, Ordering::Relaxed);
    }

    /// The throughput we aim for: the fraction of time the mutator should run.
    pub fn throughput_goal(&self) -> f64 {
        1.0 - 1.0 / (1.0 + self.gc_time_ratio as f64)
    }

    pub fn gc_cost(&self) -> f64 {
        self.avg_gc_cost.load(Ordering::Relaxed)
    }

    /// Record one collection pause and the mutator interval before it.
    pub fn record_collection_cost(&self, gc_seconds: f64, mutator_seconds: f64) {
        let total = gc_seconds + mutator_seconds;
        let sample = if total > 0.0 { gc_seconds / total } else { 0.0 };
        let count = self.collections.fetch_add(1, Ordering::Relaxed);
        // The first sample is taken as is, so the average does not start out biased towards 0.
        let weight = if count == 0 {
            100.0
        } else {
            ADAPTIVE_SIZE_POLICY_WEIGHT
        };
        let old = self.avg_gc_cost.load(Ordering::Relaxed);
        let new = ((100.0 - weight) * old + weight * sample) / 100.0;
        self.avg_gc_cost.store(new.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    /// Check the overhead limit after a full collection left `free_bytes` of `capacity_bytes`
    /// free.
    pub fn check_gc_overhead_limit(&self, capacity_bytes: usize, free_bytes: usize) {
        if !self.limits.enabled {
            return;
        }
        let time_exceeded = self.gc_cost() * 100.0 > self.limits.gc_time_limit as f64;
        let free_exceeded = (free_bytes as u128) * 100
            < (capacity_bytes as u128) * self.limits.gc_heap_free_limit as u128;
        if time_exceeded && free_exceeded {
            let count = self.overhead_limit_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count >= self.limits.threshold {
                warn!(
                    "GC overhead limit exceeded: {:.1}% of time in GC, {} of {} free",
                    self.gc_cost() * 100.0,
                    bytes_to_formatted_string(free_bytes),
                    bytes_to_formatted_string(capacity_bytes)
                );
                self.overhead_limit_exceeded.store(true, Ordering::Relaxed);
                self.overhead_limit_count.store(0, Ordering::Relaxed);
            } else if self.gc_overhead_limit_near() {
                debug!("GC overhead limit is near ({} of {})", count, self.limits.threshold);
            }
        } else {
            self.overhead_limit_count.store(0, Ordering::Relaxed);
        }
    }

    pub fn gc_overhead_limit_exceeded(&self) -> bool {
        self.overhead_limit_exceeded.load(Ordering::Relaxed)
    }

    pub fn set_gc_overhead_limit_exceeded(&self, v: bool) {
        self.overhead_limit_exceeded.store(v, Ordering::Relaxed);
    }

    pub fn gc_overhead_limit_count(&self) -> usize {
        self.overhead_limit_count.load(Ordering::Relaxed)
    }

    /// One more counted collection would exceed the limit. Collectors use this to decide to clear
    /// soft references before the limit is actually reported.
    pub fn gc_overhead_limit_near(&self) -> bool {
        self.gc_overhead_limit_count() + 1 >= self.limits.threshold
    }
}
