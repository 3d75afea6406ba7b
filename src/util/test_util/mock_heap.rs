//! A heap manager for tests: two bump-allocated generations and a scripted GC locker.
//!
//! Collections are recorded rather than run. A collection empties the generations it covers,
//! unless the test asked it to free nothing.

use crate::policy::generational::GenerationKind;
use crate::util::constants::BYTES_IN_WORD;
use crate::util::Address;
use crate::vm::{CollectedHeap, CollectionOutcome, CollectionRequest, Generation};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

const YOUNG_BASE: usize = 0x1000_0000;
const OLD_BASE: usize = 0x4000_0000;

pub struct MockGeneration {
    kind: GenerationKind,
    base: Address,
    capacity: AtomicUsize,
    reserved: usize,
    used: AtomicUsize,
    /// Requests above this many words go elsewhere.
    max_word_size: AtomicUsize,
    /// Number of successful `expand` calls.
    pub expansions: AtomicUsize,
}

impl MockGeneration {
    pub fn new(kind: GenerationKind, capacity: usize, reserved: usize) -> Self {
        let base = match kind {
            GenerationKind::Young => YOUNG_BASE,
            GenerationKind::Old => OLD_BASE,
        };
        MockGeneration {
            kind,
            base: unsafe { Address::from_usize(base) },
            capacity: AtomicUsize::new(capacity),
            reserved,
            used: AtomicUsize::new(0),
            max_word_size: AtomicUsize::new(usize::MAX),
            expansions: AtomicUsize::new(0),
        }
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    /// Pretend `bytes` are in use.
    pub fn fill(&self, bytes: usize) {
        self.used.store(bytes, Ordering::SeqCst);
    }

    pub fn fill_up(&self) {
        self.fill(self.capacity());
    }

    pub fn set_max_word_size(&self, words: usize) {
        self.max_word_size.store(words, Ordering::SeqCst);
    }

    pub fn base(&self) -> Address {
        self.base
    }
}

impl Generation for MockGeneration {
    fn kind(&self) -> GenerationKind {
        self.kind
    }

    fn capacity(&self) -> usize {
        self.capacity.load(Ordering::SeqCst)
    }

    fn reserved(&self) -> usize {
        self.reserved
    }

    fn should_allocate(&self, word_size: usize, is_tlab: bool) -> bool {
        // Only the young generation hands out TLABs.
        word_size > 0
            && word_size <= self.max_word_size.load(Ordering::SeqCst)
            && (!is_tlab || self.kind == GenerationKind::Young)
    }

    fn allocate(&self, word_size: usize, _is_tlab: bool) -> Option<Address> {
        let bytes = word_size * BYTES_IN_WORD;
        let capacity = self.capacity();
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                if used + bytes <= capacity {
                    Some(used + bytes)
                } else {
                    None
                }
            })
            .ok()
            .map(|used| self.base + used)
    }

    fn expand(&self, bytes: usize) -> bool {
        let reserved = self.reserved;
        let expanded = self
            .capacity
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |capacity| {
                if capacity + bytes <= reserved {
                    Some(capacity + bytes)
                } else {
                    None
                }
            })
            .is_ok();
        if expanded {
            self.expansions.fetch_add(1, Ordering::SeqCst);
        }
        expanded
    }
}

pub struct MockHeap {
    pub young: MockGeneration,
    pub old: MockGeneration,
    collections: AtomicUsize,
    requests: Mutex<Vec<CollectionRequest>>,
    /// Collections free the generations they cover.
    collection_frees: AtomicBool,
    gc_locker_active: AtomicBool,
    gc_locker_held: AtomicBool,
    /// Stalling on the GC locker releases it.
    stall_releases_locker: AtomicBool,
    pub stalls: AtomicUsize,
    /// The next `collect_for_allocation` calls find that another thread collected.
    skip_pauses: AtomicUsize,
    incremental_will_fail: AtomicBool,
    incremental_failed: AtomicBool,
}

impl MockHeap {
    pub fn new(young_capacity: usize, young_reserved: usize, old_capacity: usize, old_reserved: usize) -> Self {
        MockHeap {
            young: MockGeneration::new(GenerationKind::Young, young_capacity, young_reserved),
            old: MockGeneration::new(GenerationKind::Old, old_capacity, old_reserved),
            collections: AtomicUsize::new(0),
            requests: Mutex::new(vec![]),
            collection_frees: AtomicBool::new(true),
            gc_locker_active: AtomicBool::new(false),
            gc_locker_held: AtomicBool::new(false),
            stall_releases_locker: AtomicBool::new(true),
            stalls: AtomicUsize::new(0),
            skip_pauses: AtomicUsize::new(0),
            incremental_will_fail: AtomicBool::new(false),
            incremental_failed: AtomicBool::new(false),
        }
    }

    /// The collections requested so far, oldest first.
    pub fn requests(&self) -> Vec<CollectionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_collection_frees(&self, v: bool) {
        self.collection_frees.store(v, Ordering::SeqCst);
    }

    pub fn set_gc_locker_active(&self, v: bool) {
        self.gc_locker_active.store(v, Ordering::SeqCst);
    }

    pub fn set_gc_locker_held(&self, v: bool) {
        self.gc_locker_held.store(v, Ordering::SeqCst);
    }

    pub fn set_stall_releases_locker(&self, v: bool) {
        self.stall_releases_locker.store(v, Ordering::SeqCst);
    }

    pub fn skip_next_pauses(&self, n: usize) {
        self.skip_pauses.store(n, Ordering::SeqCst);
    }

    pub fn set_incremental_collection_will_fail(&self, v: bool) {
        self.incremental_will_fail.store(v, Ordering::SeqCst);
    }

    pub fn set_incremental_collection_failed(&self, v: bool) {
        self.incremental_failed.store(v, Ordering::SeqCst);
    }
}

impl CollectedHeap for MockHeap {
    fn generation(&self, kind: GenerationKind) -> &dyn Generation {
        match kind {
            GenerationKind::Young => &self.young,
            GenerationKind::Old => &self.old,
        }
    }

    fn total_collections(&self) -> usize {
        self.collections.load(Ordering::SeqCst)
    }

    fn gc_locker_is_active_and_needs_gc(&self) -> bool {
        self.gc_locker_active.load(Ordering::SeqCst)
    }

    fn gc_locker_held_by_current_thread(&self) -> bool {
        self.gc_locker_held.load(Ordering::SeqCst)
    }

    fn gc_locker_stall_until_clear(&self) {
        self.stalls.fetch_add(1, Ordering::SeqCst);
        if self.stall_releases_locker.load(Ordering::SeqCst) {
            self.gc_locker_active.store(false, Ordering::SeqCst);
        }
    }

    fn incremental_collection_will_fail(&self, _consult_young: bool) -> bool {
        self.incremental_will_fail.load(Ordering::SeqCst)
    }

    fn incremental_collection_failed(&self) -> bool {
        self.incremental_failed.load(Ordering::SeqCst)
    }

    fn do_collection(&self, request: &CollectionRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(*request);
        self.collections.fetch_add(1, Ordering::SeqCst);
        if self.collection_frees.load(Ordering::SeqCst) {
            self.young.fill(0);
            if request.full {
                self.old.fill(0);
            }
        }
    }

    fn collect_for_allocation(
        &self,
        gc_count_before: usize,
        satisfy: &mut dyn FnMut() -> Option<Address>,
    ) -> CollectionOutcome {
        let skipped = self
            .skip_pauses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if skipped || gc_count_before != self.total_collections() {
            return CollectionOutcome::Skipped;
        }
        if self.gc_locker_is_active_and_needs_gc() {
            return CollectionOutcome::GcLocked;
        }
        CollectionOutcome::Completed(satisfy())
    }
}
