use crate::error::{PolicyError, PolicyResult};
use crate::policy::generational::{GenerationKind, Generations};
use crate::policy::global::{AllocationFailure, BasePolicy, ClearedAllSoftRefs};
use crate::util::conversions::*;
use crate::util::gc_cause::GcCause;
use crate::util::heap::SizeParameters;
use crate::util::options::Options;
use crate::util::Address;
use crate::vm::{CollectedHeap, CollectionOutcome, CollectionRequest, Generation};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Common implementation for generational policies. Each generational policy should include this
/// type, and forward calls to it where possible.
///
/// This sizes the young generation, and implements the allocation path: young generation first,
/// then (if the policy allows) the older generations, then a collection, then heap expansion.
pub struct GenPolicy {
    pub base: BasePolicy,
    min_young: usize,
    initial_young: usize,
    max_young: usize,
    generations: Option<Generations>,
    /// The smallest allocation, in words, the oldest generation failed since the last collection
    /// or expansion. 0 if none.
    old_gen_failed_word_size: AtomicUsize,
}

/// A ratio must be at least 1, and `extra_parts` must still be addable to it.
fn check_ratio(name: &'static str, value: usize, extra_parts: usize) -> PolicyResult<()> {
    if value == 0 || value.checked_add(extra_parts).is_none() {
        return Err(PolicyError::InvalidRatio { name, value });
    }
    Ok(())
}

impl GenPolicy {
    pub fn new(options: Arc<Options>) -> Self {
        GenPolicy {
            base: BasePolicy::new(options),
            min_young: 0,
            initial_young: 0,
            max_young: 0,
            generations: None,
            old_gen_failed_word_size: AtomicUsize::new(0),
        }
    }

    pub fn gen_alignment(&self) -> usize {
        self.base.alignments().generation()
    }

    /// The young generation size bounds.
    pub fn young_size_params(&self) -> SizeParameters {
        SizeParameters::new(self.min_young, self.initial_young, self.max_young)
    }

    /// Replace the minimum and initial young sizes, keeping `min <= initial <= max`.
    pub(crate) fn set_young_sizes(&mut self, min: usize, initial: usize) {
        self.initial_young = initial.min(self.max_young);
        self.min_young = min.min(self.initial_young);
    }

    pub(crate) fn set_initial_young(&mut self, initial: usize) {
        self.initial_young = initial;
    }

    pub fn generations(&self) -> Option<&Generations> {
        self.generations.as_ref()
    }

    pub(crate) fn set_generations(&mut self, generations: Generations) {
        for spec in generations.iter() {
            info!("{} generation: {}", spec.kind(), spec);
        }
        self.generations = Some(generations);
    }

    /// The smallest young generation we accept: room for an eden and two survivor spaces.
    pub fn young_gen_size_lower_bound(&self) -> usize {
        let alignments = self.base.alignments();
        raw_align_up(3 * alignments.space(), alignments.generation())
    }

    /// The young part of `base_size` according to `new_ratio` (old / young), rounded down to the
    /// generation alignment. A result that would round to zero is one alignment unit instead, if
    /// `base_size` has room for it. Never larger than `base_size`.
    pub fn scale_by_new_ratio_aligned(&self, base_size: usize) -> usize {
        let alignment = self.gen_alignment();
        let scaled = raw_align_down(base_size / (*self.base.flags().new_ratio + 1), alignment);
        if scaled == 0 && base_size >= alignment {
            alignment
        } else {
            scaled
        }
    }

    /// `desired_size`, but leave at least one generation alignment of `maximum_size` for the
    /// other generation.
    pub fn bound_minus_alignment(&self, desired_size: usize, maximum_size: usize) -> usize {
        desired_size.min(maximum_size.saturating_sub(self.gen_alignment()))
    }

    /// Make the young generation flags consistent: the heap has room for two generations, the
    /// young generation is at least its lower bound, and `new_size <= max_new_size < max_heap`.
    pub fn initialize_flags(&mut self) -> PolicyResult<()> {
        self.base.initialize_flags()?;
        // new_ratio divides the heap into 1 + new_ratio parts, survivor_ratio the young
        // generation into 2 + survivor_ratio.
        check_ratio("new_ratio", *self.base.flags().new_ratio, 1)?;
        check_ratio("survivor_ratio", *self.base.flags().survivor_ratio, 2)?;
        let alignments = self.base.alignments();
        let gen_alignment = alignments.generation();

        let mut smallest_new_size = self.young_gen_size_lower_bound();
        let smallest_heap_size = raw_align_up(
            smallest_new_size + raw_align_up(alignments.space(), gen_alignment),
            alignments.heap(),
        );
        if self.base.max_heap_byte_size() < smallest_heap_size {
            debug!("Raising maximum heap to {}", bytes_to_formatted_string(smallest_heap_size));
            self.base.set_max_heap_byte_size(smallest_heap_size);
        }
        if self.base.min_heap_byte_size() < smallest_heap_size {
            self.base.set_min_heap_byte_size(smallest_heap_size);
            if self.base.initial_heap_byte_size() < smallest_heap_size {
                self.base.set_initial_heap_byte_size(smallest_heap_size);
            }
        }

        let flags = self.base.flags_mut();
        let max_heap = *flags.max_heap_size;

        // Silently round new_size, but remember whether the user set it: the size info depends on
        // it.
        smallest_new_size = smallest_new_size.max(raw_align_down(*flags.new_size, gen_alignment));
        if smallest_new_size != *flags.new_size {
            flags.new_size.update(smallest_new_size);
        }
        self.initial_young = smallest_new_size;

        if !flags.max_new_size.is_default() {
            let min_new_size = gen_alignment.max(self.min_young);
            if *flags.max_new_size >= max_heap {
                // Leave room for an old generation.
                let smaller_max_new_size = max_heap - gen_alignment;
                if flags.max_new_size.is_explicit() {
                    warn!(
                        "max_new_size ({}) is equal to or greater than the entire heap ({}). A new max generation size of {} will be used.",
                        bytes_to_formatted_string(*flags.max_new_size),
                        bytes_to_formatted_string(max_heap),
                        bytes_to_formatted_string(smaller_max_new_size)
                    );
                }
                flags.max_new_size.set_ergo(smaller_max_new_size);
                if *flags.new_size > smaller_max_new_size {
                    flags.new_size.set_ergo(smaller_max_new_size);
                    self.initial_young = smaller_max_new_size;
                }
            } else if *flags.max_new_size < min_new_size {
                flags.max_new_size.set_ergo(min_new_size);
            } else if !raw_is_aligned(*flags.max_new_size, gen_alignment) {
                let aligned = raw_align_down(*flags.max_new_size, gen_alignment);
                flags.max_new_size.set_ergo(aligned);
            }
            self.max_young = *flags.max_new_size;
        }

        if *flags.new_size > *flags.max_new_size {
            // Only a large new_size and a small (but not too small) max_new_size get here.
            if flags.max_new_size.is_explicit() {
                warn!(
                    "new_size ({}) is greater than max_new_size ({}). A new max generation size of {} will be used.",
                    bytes_to_formatted_string(*flags.new_size),
                    bytes_to_formatted_string(*flags.max_new_size),
                    bytes_to_formatted_string(*flags.new_size)
                );
            }
            let new_size = *flags.new_size;
            flags.max_new_size.set_ergo(new_size);
            self.max_young = new_size;
        }

        #[cfg(any(debug_assertions, feature = "extreme_assertions"))]
        self.assert_flags();
        Ok(())
    }

    /// Compute the minimum, initial and maximum young generation sizes.
    pub fn initialize_size_info(&mut self) -> PolicyResult<()> {
        self.base.initialize_size_info()?;

        let min_heap = self.base.min_heap_byte_size();
        let initial_heap = self.base.initial_heap_byte_size();
        let max_heap = self.base.max_heap_byte_size();
        let flags = self.base.flags();
        let new_size = *flags.new_size;

        let mut max_new_size = if !flags.max_new_size.is_default() {
            *flags.max_new_size
        } else {
            // Bound by new_size below, since the ratio can give a size that is too small, and by
            // max_new_size above.
            self.scale_by_new_ratio_aligned(max_heap)
                .max(new_size)
                .min(*flags.max_new_size)
        };
        debug_assert!(max_new_size > 0, "All paths should set max_new_size");

        if max_heap == min_heap {
            // The heap cannot grow, so neither can the young generation.
            self.min_young = max_new_size;
            self.initial_young = max_new_size;
            self.max_young = max_new_size;
        } else {
            let (min_young, desired_new_size) = if flags.new_size.is_explicit() {
                // The user's new_size is both the initial size and the lower limit.
                max_new_size = max_new_size.max(new_size);
                (new_size, new_size)
            } else if flags.new_size.is_ergonomic() {
                // An ergonomic new_size is the lower limit, the ratio gives the initial size.
                max_new_size = max_new_size.max(new_size);
                (new_size, self.scale_by_new_ratio_aligned(initial_heap).max(new_size))
            } else {
                // The default new_size is a floor for the ratio, which can give tiny sizes when
                // new_ratio is large.
                (
                    self.scale_by_new_ratio_aligned(min_heap).max(new_size),
                    self.scale_by_new_ratio_aligned(initial_heap).max(new_size),
                )
            };
            debug_assert!(min_young > 0, "Sanity check");

            // Bound each by the corresponding heap size.
            let min_young = self.bound_minus_alignment(min_young, min_heap);
            let initial_young = self.bound_minus_alignment(desired_new_size, initial_heap);
            let max_young = self.bound_minus_alignment(max_new_size, max_heap);

            // min <= initial <= max
            let min_young = min_young.min(max_young);
            let initial_young = initial_young.min(max_young).max(min_young);
            self.min_young = min_young.min(initial_young);
            self.initial_young = initial_young;
            self.max_young = max_young;
        }

        self.write_back_young_flags();
        debug!("Young generation: {}", self.young_size_params());

        #[cfg(any(debug_assertions, feature = "extreme_assertions"))]
        self.assert_size_info();
        Ok(())
    }

    /// Publish the young sizes through the flags.
    pub(crate) fn write_back_young_flags(&mut self) {
        let (initial_young, max_young) = (self.initial_young, self.max_young);
        let flags = self.base.flags_mut();
        if *flags.new_size != initial_young {
            flags.new_size.set_ergo(initial_young);
        }
        if *flags.max_new_size != max_young {
            flags.max_new_size.set_ergo(max_young);
        }
    }

    pub fn assert_flags(&self) {
        self.base.assert_flags();
        let flags = self.base.flags();
        let gen_alignment = self.gen_alignment();
        assert!(*flags.new_size >= self.min_young, "Ergonomics decided on a too small young gen size");
        assert!(
            *flags.new_size <= *flags.max_new_size,
            "Ergonomics decided on incompatible initial and maximum young gen sizes"
        );
        assert!(
            flags.max_new_size.is_default() || *flags.max_new_size < *flags.max_heap_size,
            "Ergonomics decided on incompatible maximum young gen and heap sizes"
        );
        assert!(raw_is_aligned(*flags.new_size, gen_alignment), "new_size alignment");
        assert!(
            flags.max_new_size.is_default() || raw_is_aligned(*flags.max_new_size, gen_alignment),
            "max_new_size alignment"
        );
    }

    pub fn assert_size_info(&self) {
        self.base.assert_size_info();
        let flags = self.base.flags();
        assert!(
            self.max_young < self.base.max_heap_byte_size(),
            "Ergonomics decided on incompatible maximum young and heap sizes"
        );
        assert_eq!(*flags.new_size, self.initial_young, "Discrepancy between new_size flag and local storage");
        assert_eq!(*flags.max_new_size, self.max_young, "Discrepancy between max_new_size flag and local storage");
        let young = self.young_size_params();
        assert!(
            young.min() == self.min_young && young.initial() == self.initial_young && young.max() == self.max_young,
            "Ergonomics decided on incompatible young gen sizes: min {}, initial {}, max {}",
            self.min_young,
            self.initial_young,
            self.max_young
        );
        assert!(young.is_aligned_to(self.gen_alignment()), "Young gen sizes {} are not aligned", young);
    }

    /// Reconcile the young generation maximum with what the heap actually reserved.
    pub fn post_heap_initialize(&mut self, heap: &dyn CollectedHeap) -> PolicyResult<()> {
        if !self.base.is_initialized() {
            return Err(PolicyError::NotInitialized);
        }
        let reserved = raw_align_down(heap.generation(GenerationKind::Young).reserved(), self.gen_alignment());
        if reserved != self.max_young && reserved >= self.initial_young {
            debug!(
                "Heap reserved {} for the young generation, not {}",
                bytes_to_formatted_string(reserved),
                bytes_to_formatted_string(self.max_young)
            );
            self.max_young = reserved;
            self.base.flags_mut().max_new_size.set_ergo(reserved);
            if let Some(generations) = self.generations.as_mut() {
                *generations = generations.with_young_max(reserved);
            }
        }
        debug_assert_eq!(self.max_young, *self.base.flags().max_new_size, "Should be taken care of by initialize_size_info");
        Ok(())
    }

    /* Allocation */

    /// Whether an allocation that failed in the young generation should be tried in the older
    /// generations before collecting.
    ///
    /// Requests larger than the young generation, and requests while the GC locker holds off
    /// collection or after a failed young collection, always try. Otherwise we try unless the
    /// oldest generation already failed an allocation no larger than this one since the last
    /// collection or expansion.
    pub fn should_try_older_generation_allocation(&self, heap: &dyn CollectedHeap, word_size: usize) -> bool {
        let young_capacity = heap.generation(GenerationKind::Young).capacity();
        if word_size > bytes_to_words_up(young_capacity)
            || heap.gc_locker_is_active_and_needs_gc()
            || heap.incremental_collection_failed()
        {
            return true;
        }
        let failed = self.old_gen_failed_word_size.load(Ordering::Relaxed);
        failed == 0 || failed > word_size
    }

    fn record_old_generation_failure(&self, word_size: usize) {
        let _ = self
            .old_gen_failed_word_size
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |failed| {
                if failed == 0 || word_size < failed {
                    Some(word_size)
                } else {
                    None
                }
            });
    }

    fn clear_old_generation_failure(&self) {
        self.old_gen_failed_word_size.store(0, Ordering::Relaxed);
    }

    /// Try the generations youngest first. With `first_only`, stop after the first generation
    /// that would take the request.
    pub fn attempt_allocation(
        &self,
        heap: &dyn CollectedHeap,
        word_size: usize,
        is_tlab: bool,
        first_only: bool,
    ) -> Option<Address> {
        for kind in [GenerationKind::Young, GenerationKind::Old] {
            let gen = heap.generation(kind);
            if !gen.should_allocate(word_size, is_tlab) {
                continue;
            }
            if let Some(result) = gen.allocate(word_size, is_tlab) {
                return Some(result);
            }
            if kind == GenerationKind::Old {
                self.record_old_generation_failure(word_size);
            }
            if first_only {
                break;
            }
        }
        None
    }

    /// Grow a generation, oldest first, and allocate in it.
    pub fn expand_heap_and_allocate(
        &self,
        heap: &dyn CollectedHeap,
        word_size: usize,
        is_tlab: bool,
    ) -> Option<Address> {
        for kind in [GenerationKind::Old, GenerationKind::Young] {
            let gen = heap.generation(kind);
            if !gen.should_allocate(word_size, is_tlab) {
                continue;
            }
            if let Some(result) = self.expand_and_allocate(heap, gen, word_size, is_tlab) {
                return Some(result);
            }
        }
        None
    }

    fn expand_and_allocate(
        &self,
        heap: &dyn CollectedHeap,
        gen: &dyn Generation,
        word_size: usize,
        is_tlab: bool,
    ) -> Option<Address> {
        let bytes = raw_align_up(words_to_bytes(word_size), self.gen_alignment());
        let heap_room = self.base.max_heap_byte_size().saturating_sub(heap.capacity());
        let gen_room = gen.reserved().saturating_sub(gen.capacity());
        let room = heap_room.min(gen_room);
        if bytes > room {
            trace!(
                "Cannot expand {} generation by {}: {} left",
                gen.kind(),
                bytes_to_formatted_string(bytes),
                bytes_to_formatted_string(room)
            );
            return None;
        }

        // Grow by at least min_heap_delta_bytes, if there is room for that.
        let desired = bytes.max(*self.base.flags().min_heap_delta_bytes);
        let expanded_by = if desired > bytes && desired <= room && gen.expand(desired) {
            desired
        } else if gen.expand(bytes) {
            bytes
        } else {
            return None;
        };
        debug!("Expanded {} generation by {}", gen.kind(), bytes_to_formatted_string(expanded_by));
        self.clear_old_generation_failure();
        gen.allocate(word_size, is_tlab)
    }

    /// Ask the heap for a collection. Soft references are cleared if `clear_all_soft_refs` is set
    /// or if the policy asked for it, and the policy is told once the collection is over.
    fn collect(&self, heap: &dyn CollectedHeap, request: CollectionRequest) {
        let clear_all_soft_refs = request.clear_all_soft_refs || self.base.should_clear_all_soft_refs();
        let casr = ClearedAllSoftRefs::new(clear_all_soft_refs, &self.base);
        self.base.set_all_soft_refs_clear(false);
        self.clear_old_generation_failure();
        debug!(
            "{} collection ({}), clear soft refs: {}",
            if request.full { "Full" } else { "Incremental" },
            request.cause,
            casr.should_clear()
        );
        heap.do_collection(&CollectionRequest {
            clear_all_soft_refs: casr.should_clear(),
            ..request
        });
    }

    pub fn satisfy_failed_allocation(
        &self,
        heap: &dyn CollectedHeap,
        word_size: usize,
        is_tlab: bool,
    ) -> Option<Address> {
        debug_assert!(word_size != 0, "Precondition violated");
        let request = CollectionRequest {
            cause: GcCause::AllocationFailure,
            full: false,
            clear_all_soft_refs: false,
            word_size,
            is_tlab,
            max_generation: GenerationKind::Old,
        };

        if heap.gc_locker_is_active_and_needs_gc() {
            // We cannot collect. Expand if there is room.
            if !heap.is_maximal_no_gc() {
                return self.expand_heap_and_allocate(heap, word_size, is_tlab);
            }
            return None;
        } else if !heap.incremental_collection_will_fail(false) {
            self.collect(heap, request);
        } else {
            debug!("Trying a full collection because a young collection may fail");
            self.collect(heap, CollectionRequest { full: true, ..request });
        }

        if let Some(result) = self.attempt_allocation(heap, word_size, is_tlab, false) {
            return Some(result);
        }

        if let Some(result) = self.expand_heap_and_allocate(heap, word_size, is_tlab) {
            return Some(result);
        }

        // We are really out of memory. Collect everything, including soft references, before
        // giving up.
        self.collect(
            heap,
            CollectionRequest {
                cause: GcCause::LastDitchCollection,
                full: true,
                clear_all_soft_refs: true,
                ..request
            },
        );

        let result = self.attempt_allocation(heap, word_size, is_tlab, false);
        debug_assert!(
            result.is_some() || !self.base.should_clear_all_soft_refs() || self.base.size_policy().is_some(),
            "Flag should have been handled and cleared prior to this point"
        );
        result
    }

    pub fn mem_allocate_work(
        &self,
        heap: &dyn CollectedHeap,
        word_size: usize,
        is_tlab: bool,
    ) -> Result<Address, AllocationFailure> {
        let retry_limit = *self.base.flags().gc_locker_retry_allocation_count;
        let warning_count = *self.base.flags().queued_allocation_warning_count;
        let mut gclocker_stalled_count = 0;
        let mut try_count: usize = 1;

        loop {
            // The first attempt does not take the heap lock.
            let young = heap.generation(GenerationKind::Young);
            if young.should_allocate(word_size, is_tlab) {
                if let Some(result) = young.par_allocate(word_size, is_tlab) {
                    return Ok(result);
                }
            }

            // Only requests the policy lets through get a shot at the older generations.
            let first_only = !self.should_try_older_generation_allocation(heap, word_size);
            if let Some(result) = self.attempt_allocation(heap, word_size, is_tlab, first_only) {
                return Ok(result);
            }

            if heap.gc_locker_is_active_and_needs_gc() {
                if is_tlab {
                    // The caller will retry allocating the individual object.
                    return Err(AllocationFailure::GcLockerActive);
                }
                if !heap.is_maximal_no_gc() {
                    if let Some(result) = self.expand_heap_and_allocate(heap, word_size, is_tlab) {
                        return Ok(result);
                    }
                }
                if gclocker_stalled_count > retry_limit {
                    // We did not get to collect, and we did not get any memory.
                    return Err(AllocationFailure::GcLockerActive);
                }
                if heap.gc_locker_held_by_current_thread() {
                    warn!("Allocating {} words while holding the GC locker", word_size);
                    return Err(AllocationFailure::GcLockerActive);
                }
                // Wait for the critical regions to end. The last thread leaving starts a
                // collection, so retry from the start rather than collecting again.
                debug!("Stalling allocation of {} words on the GC locker", word_size);
                heap.gc_locker_stall_until_clear();
                gclocker_stalled_count += 1;
                try_count += 1;
                continue;
            }

            let gc_count_before = heap.total_collections();
            let outcome = heap.collect_for_allocation(gc_count_before, &mut || {
                self.satisfy_failed_allocation(heap, word_size, is_tlab)
            });
            match outcome {
                CollectionOutcome::Completed(result) => {
                    // If the overhead limit was exceeded in this collection, give up so the
                    // caller reports it, and reset it so it does not persist.
                    if let Some(size_policy) = self.base.size_policy() {
                        if size_policy.gc_overhead_limit_exceeded() && self.base.all_soft_refs_clear() {
                            size_policy.set_gc_overhead_limit_exceeded(false);
                            return Err(AllocationFailure::GcOverheadLimitExceeded);
                        }
                    }
                    return result.ok_or(AllocationFailure::OutOfMemory);
                }
                CollectionOutcome::GcLocked => {
                    // Retry and stall as necessary.
                }
                CollectionOutcome::Skipped => {
                    if warning_count > 0 && try_count % warning_count == 0 {
                        warn!(
                            "mem_allocate_work retries {} times, size={}{}",
                            try_count,
                            word_size,
                            if is_tlab { " (TLAB)" } else { "" }
                        );
                    }
                }
            }
            try_count += 1;
        }
    }
}

impl Generations {
    /// A copy with the young generation's maximum size replaced.
    fn with_young_max(&self, max: usize) -> Generations {
        let mut young = *self.youngest();
        young.size.set_max(max);
        Generations::new(young, *self.oldest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::*;
    use crate::util::heap::alignment::generational_alignments;
    use crate::util::test_util::mock_heap::MockHeap;

    fn gen_policy(options: &str) -> GenPolicy {
        let mut opts = Options::default();
        assert!(opts.set_bulk_from_str(options));
        let mut policy = GenPolicy::new(Arc::new(opts));
        let alignments = generational_alignments(policy.base.flags());
        policy.base.set_alignments(alignments);
        policy
    }

    #[test]
    fn lower_bound_is_three_spaces() {
        let policy = gen_policy("max_heap_size=64m");
        assert_eq!(policy.young_gen_size_lower_bound(), 3 * GEN_GRAIN);

        let policy = gen_policy("max_heap_size=64m use_large_pages=true large_page_size=1m");
        assert_eq!(policy.young_gen_size_lower_bound(), BYTES_IN_MBYTE);
    }

    #[test]
    fn scale_by_new_ratio() {
        let policy = gen_policy("max_heap_size=256m new_ratio=2 use_large_pages=true large_page_size=1m");
        assert_eq!(policy.scale_by_new_ratio_aligned(256 * BYTES_IN_MBYTE), 85 * BYTES_IN_MBYTE);
        assert_eq!(policy.scale_by_new_ratio_aligned(150 * BYTES_IN_MBYTE), 50 * BYTES_IN_MBYTE);
        // Too small to divide, but one unit fits.
        assert_eq!(policy.scale_by_new_ratio_aligned(BYTES_IN_MBYTE), BYTES_IN_MBYTE);
        // Not even one unit fits.
        assert_eq!(policy.scale_by_new_ratio_aligned(BYTES_IN_KBYTE), 0);
        assert_eq!(policy.scale_by_new_ratio_aligned(0), 0);
    }

    #[test]
    fn bound_minus_alignment() {
        let policy = gen_policy("max_heap_size=64m");
        assert_eq!(policy.bound_minus_alignment(BYTES_IN_MBYTE, 64 * BYTES_IN_MBYTE), BYTES_IN_MBYTE);
        assert_eq!(
            policy.bound_minus_alignment(64 * BYTES_IN_MBYTE, 64 * BYTES_IN_MBYTE),
            64 * BYTES_IN_MBYTE - GEN_GRAIN
        );
        assert_eq!(policy.bound_minus_alignment(BYTES_IN_MBYTE, 0), 0);
    }

    #[test]
    fn young_sizes_follow_ratio() {
        let mut policy = gen_policy("max_heap_size=96m initial_heap_size=48m min_heap_size=24m new_ratio=2");
        policy.initialize_flags().unwrap();
        policy.initialize_size_info().unwrap();
        let young = policy.young_size_params();
        assert_eq!(young.min(), 8 * BYTES_IN_MBYTE);
        assert_eq!(young.initial(), 16 * BYTES_IN_MBYTE);
        assert_eq!(young.max(), 32 * BYTES_IN_MBYTE);
        assert!(policy.base.flags().new_size.is_ergonomic());
    }

    #[test]
    fn explicit_new_size_is_the_floor() {
        let mut policy = gen_policy("max_heap_size=96m initial_heap_size=48m min_heap_size=24m new_size=12m");
        policy.initialize_flags().unwrap();
        policy.initialize_size_info().unwrap();
        let young = policy.young_size_params();
        assert_eq!(young.min(), 12 * BYTES_IN_MBYTE);
        assert_eq!(young.initial(), 12 * BYTES_IN_MBYTE);
        assert_eq!(young.max(), 32 * BYTES_IN_MBYTE);
    }

    #[test]
    fn max_new_size_leaves_room_for_old() {
        let mut policy = gen_policy("max_heap_size=64m initial_heap_size=64m max_new_size=128m");
        policy.initialize_flags().unwrap();
        assert_eq!(*policy.base.flags().max_new_size, 64 * BYTES_IN_MBYTE - GEN_GRAIN);
        assert!(policy.base.flags().max_new_size.is_ergonomic());
    }

    #[test]
    fn new_size_larger_than_max_new_size() {
        let mut policy = gen_policy("max_heap_size=64m initial_heap_size=64m new_size=16m max_new_size=8m");
        policy.initialize_flags().unwrap();
        assert_eq!(*policy.base.flags().max_new_size, 16 * BYTES_IN_MBYTE);
    }

    #[test]
    fn tiny_heap_is_raised() {
        let mut policy = gen_policy("max_heap_size=1m initial_heap_size=1m");
        policy.initialize_flags().unwrap();
        assert_eq!(policy.base.max_heap_byte_size(), CARD_SIZE * BYTES_IN_PAGE);
        assert_eq!(policy.base.min_heap_byte_size(), CARD_SIZE * BYTES_IN_PAGE);
    }

    #[test]
    fn invalid_ratios() {
        let mut policy = gen_policy("max_heap_size=64m new_ratio=0");
        assert_eq!(
            policy.initialize_flags(),
            Err(PolicyError::InvalidRatio { name: "new_ratio", value: 0 })
        );
        let mut policy = gen_policy("max_heap_size=64m survivor_ratio=0");
        assert!(matches!(
            policy.initialize_flags(),
            Err(PolicyError::InvalidRatio { name: "survivor_ratio", .. })
        ));
    }

    #[test]
    fn ratios_too_large_to_split_a_generation() {
        let mut policy = gen_policy(&format!("max_heap_size=64m new_ratio={}", usize::MAX));
        assert_eq!(
            policy.initialize_flags(),
            Err(PolicyError::InvalidRatio { name: "new_ratio", value: usize::MAX })
        );
        let mut policy = gen_policy(&format!("max_heap_size=64m survivor_ratio={}", usize::MAX - 1));
        assert_eq!(
            policy.initialize_flags(),
            Err(PolicyError::InvalidRatio { name: "survivor_ratio", value: usize::MAX - 1 })
        );
        // The largest ratios that still leave room for their parts.
        let mut policy = gen_policy(&format!("max_heap_size=64m new_ratio={}", usize::MAX - 1));
        assert!(policy.initialize_flags().is_ok());
        let mut policy = gen_policy(&format!("max_heap_size=64m survivor_ratio={}", usize::MAX - 2));
        assert!(policy.initialize_flags().is_ok());
    }

    #[test]
    fn older_generation_is_skipped_after_failure() {
        let policy = gen_policy("max_heap_size=64m");
        let heap = MockHeap::new(BYTES_IN_MBYTE, BYTES_IN_MBYTE, BYTES_IN_MBYTE, BYTES_IN_MBYTE);
        assert!(policy.should_try_older_generation_allocation(&heap, 16));
        policy.record_old_generation_failure(16);
        assert!(!policy.should_try_older_generation_allocation(&heap, 16));
        assert!(!policy.should_try_older_generation_allocation(&heap, 32));
        // A smaller request may still fit.
        assert!(policy.should_try_older_generation_allocation(&heap, 8));
        // Larger than the young generation.
        assert!(policy.should_try_older_generation_allocation(&heap, bytes_to_words_up(2 * BYTES_IN_MBYTE)));
        policy.clear_old_generation_failure();
        assert!(policy.should_try_older_generation_allocation(&heap, 32));
    }

    #[test]
    fn gc_locker_overrides_failure_record() {
        let policy = gen_policy("max_heap_size=64m");
        let heap = MockHeap::new(BYTES_IN_MBYTE, BYTES_IN_MBYTE, BYTES_IN_MBYTE, BYTES_IN_MBYTE);
        policy.record_old_generation_failure(16);
        heap.set_gc_locker_active(true);
        assert!(policy.should_try_older_generation_allocation(&heap, 16));
    }

    const M: usize = BYTES_IN_MBYTE;

    /// A policy for an 8M heap: 4M to start, generation alignment 64K.
    fn alloc_policy() -> GenPolicy {
        let mut policy = gen_policy("max_heap_size=8m initial_heap_size=4m min_heap_size=4m");
        policy.initialize_flags().unwrap();
        policy.initialize_size_info().unwrap();
        policy
    }

    /// Both generations full.
    fn full_heap(young: usize, young_reserved: usize, old: usize, old_reserved: usize) -> MockHeap {
        let heap = MockHeap::new(young, young_reserved, old, old_reserved);
        heap.young.fill_up();
        heap.old.fill_up();
        heap
    }

    #[test]
    fn allocates_young_first() {
        let policy = alloc_policy();
        let heap = MockHeap::new(M, 2 * M, 3 * M, 6 * M);
        assert_eq!(policy.mem_allocate_work(&heap, 16, false), Ok(heap.young.base()));
        assert_eq!(heap.young.used(), 16 * BYTES_IN_WORD);
        assert!(heap.requests().is_empty());
    }

    #[test]
    fn large_requests_go_old() {
        let policy = alloc_policy();
        let heap = MockHeap::new(M, 2 * M, 3 * M, 6 * M);
        heap.young.set_max_word_size(64);
        assert_eq!(policy.mem_allocate_work(&heap, 128, false), Ok(heap.old.base()));
    }

    #[test]
    fn exhausted_heap_at_max_fails() {
        let policy = alloc_policy();
        // 8M committed: the heap cannot grow.
        let heap = full_heap(2 * M, 2 * M, 6 * M, 6 * M);
        heap.set_collection_frees(false);

        assert_eq!(policy.satisfy_failed_allocation(&heap, 16, false), None);
        let requests = heap.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].cause, GcCause::AllocationFailure);
        assert!(!requests[0].full);
        assert!(!requests[0].clear_all_soft_refs);
        assert_eq!(requests[1].cause, GcCause::LastDitchCollection);
        assert!(requests[1].full);
        assert!(requests[1].clear_all_soft_refs);
        assert_eq!(requests[1].max_generation, GenerationKind::Old);
        assert!(policy.base.all_soft_refs_clear());
        assert!(!policy.base.should_clear_all_soft_refs());
    }

    #[test]
    fn exhausted_heap_below_max_expands() {
        let policy = alloc_policy();
        // 4M committed out of 8M.
        let heap = full_heap(M, 2 * M, 3 * M, 6 * M);
        heap.set_collection_frees(false);

        let result = policy.satisfy_failed_allocation(&heap, 16, false);
        assert_eq!(result, Some(heap.old.base() + 3 * M));
        // The old generation grew by min_heap_delta_bytes rather than by the request.
        assert_eq!(heap.old.capacity(), 3 * M + 128 * BYTES_IN_KBYTE);
        assert_eq!(heap.requests().len(), 1);
    }

    #[test]
    fn collection_makes_room() {
        let policy = alloc_policy();
        let heap = full_heap(M, 2 * M, 3 * M, 6 * M);
        assert_eq!(policy.mem_allocate_work(&heap, 16, false), Ok(heap.young.base()));
        let requests = heap.requests();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].full);
        assert_eq!(requests[0].word_size, 16);
    }

    #[test]
    fn full_collection_when_young_would_fail() {
        let policy = alloc_policy();
        let heap = full_heap(M, 2 * M, 3 * M, 6 * M);
        heap.set_incremental_collection_will_fail(true);
        assert!(policy.satisfy_failed_allocation(&heap, 16, false).is_some());
        assert!(heap.requests()[0].full);
    }

    #[test]
    fn requested_soft_ref_clearing_is_passed_on() {
        let policy = alloc_policy();
        let heap = full_heap(M, 2 * M, 3 * M, 6 * M);
        policy.base.set_should_clear_all_soft_refs(true);
        assert!(policy.satisfy_failed_allocation(&heap, 16, false).is_some());
        assert!(heap.requests()[0].clear_all_soft_refs);
        assert!(policy.base.all_soft_refs_clear());
        assert!(!policy.base.should_clear_all_soft_refs());
    }

    #[test]
    fn skipped_pause_retries() {
        let policy = alloc_policy();
        let heap = full_heap(M, 2 * M, 3 * M, 6 * M);
        heap.skip_next_pauses(2);
        assert_eq!(policy.mem_allocate_work(&heap, 16, false), Ok(heap.young.base()));
        assert_eq!(heap.requests().len(), 1);
    }

    #[test]
    fn gc_locker_fails_tlab_requests() {
        let policy = alloc_policy();
        let heap = full_heap(M, 2 * M, 3 * M, 6 * M);
        heap.set_gc_locker_active(true);
        assert_eq!(policy.mem_allocate_work(&heap, 16, true), Err(AllocationFailure::GcLockerActive));
        assert!(heap.requests().is_empty());
    }

    #[test]
    fn gc_locker_expands_instead_of_collecting() {
        let policy = alloc_policy();
        let heap = full_heap(M, 2 * M, 3 * M, 6 * M);
        heap.set_gc_locker_active(true);
        assert_eq!(policy.satisfy_failed_allocation(&heap, 16, false), Some(heap.old.base() + 3 * M));
        assert!(heap.requests().is_empty());
    }

    #[test]
    fn gc_locker_stalls_then_collects() {
        let policy = alloc_policy();
        let heap = full_heap(2 * M, 2 * M, 6 * M, 6 * M);
        heap.set_gc_locker_active(true);
        assert_eq!(policy.mem_allocate_work(&heap, 16, false), Ok(heap.young.base()));
        assert_eq!(heap.stalls.load(Ordering::SeqCst), 1);
        assert_eq!(heap.requests().len(), 1);
    }

    #[test]
    fn gc_locker_held_by_allocating_thread() {
        let policy = alloc_policy();
        let heap = full_heap(2 * M, 2 * M, 6 * M, 6 * M);
        heap.set_gc_locker_active(true);
        heap.set_gc_locker_held(true);
        heap.set_stall_releases_locker(false);
        assert_eq!(policy.mem_allocate_work(&heap, 16, false), Err(AllocationFailure::GcLockerActive));
        assert_eq!(heap.stalls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn gc_locker_gives_up_after_retries() {
        let policy = alloc_policy();
        let heap = full_heap(2 * M, 2 * M, 6 * M, 6 * M);
        heap.set_gc_locker_active(true);
        heap.set_stall_releases_locker(false);
        assert_eq!(policy.mem_allocate_work(&heap, 16, false), Err(AllocationFailure::GcLockerActive));
        assert_eq!(
            heap.stalls.load(Ordering::SeqCst),
            *policy.base.flags().gc_locker_retry_allocation_count + 1
        );
    }

    #[test]
    fn overhead_limit_is_reported_once() {
        let mut policy = alloc_policy();
        policy.base.initialize_size_policy(M, 3 * M, 64 * BYTES_IN_KBYTE);
        let heap = full_heap(2 * M, 2 * M, 6 * M, 6 * M);
        heap.set_collection_frees(false);
        policy.base.size_policy().unwrap().set_gc_overhead_limit_exceeded(true);

        assert_eq!(
            policy.mem_allocate_work(&heap, 16, false),
            Err(AllocationFailure::GcOverheadLimitExceeded)
        );
        assert!(!policy.base.size_policy().unwrap().gc_overhead_limit_exceeded());
        assert_eq!(policy.mem_allocate_work(&heap, 16, false), Err(AllocationFailure::OutOfMemory));
    }

    #[test]
    fn out_of_memory() {
        let policy = alloc_policy();
        let heap = full_heap(2 * M, 2 * M, 6 * M, 6 * M);
        heap.set_collection_frees(false);
        assert_eq!(policy.mem_allocate_work(&heap, 16, false), Err(AllocationFailure::OutOfMemory));
    }

    #[test]
    fn post_heap_initialize_requires_initialization() {
        let mut policy = alloc_policy();
        let heap = MockHeap::new(M, 2 * M, 3 * M, 6 * M);
        assert_eq!(policy.post_heap_initialize(&heap), Err(PolicyError::NotInitialized));
    }
}
