//! The root of the policy hierarchy: the [`CollectorPolicy`] trait and the state every policy
//! shares, [`BasePolicy`].

use crate::error::{PolicyError, PolicyResult};
use crate::policy::barriers::BarrierKind;
use crate::policy::generational::global::GenPolicy;
use crate::policy::generational::two_gen::TwoGenPolicy;
use crate::policy::policy_constraints::PolicyConstraints;
use crate::util::constants::*;
use crate::util::conversions::*;
use crate::util::heap::ergonomics;
use crate::util::heap::{AdaptiveSizePolicy, AlignmentSet, SizeParameters};
use crate::util::options::{CollectorSelector, Options};
use crate::util::Address;
use crate::vm::CollectedHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which policy this is. Code that needs to treat one policy specially matches on this rather
/// than asking the policy what it is.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum PolicyKind {
    MarkSweep,
    ConcurrentMarkSweep,
    AdaptiveConcurrentMarkSweep,
}

impl PolicyKind {
    /// The constraints of the policy of this kind.
    pub fn constraints(self) -> &'static PolicyConstraints {
        match self {
            PolicyKind::MarkSweep => &crate::policy::marksweep::MS_CONSTRAINTS,
            PolicyKind::ConcurrentMarkSweep => &crate::policy::cms::CMS_CONSTRAINTS,
            PolicyKind::AdaptiveConcurrentMarkSweep => &crate::policy::cms::ADAPTIVE_CMS_CONSTRAINTS,
        }
    }

    pub fn is_generational(self) -> bool {
        self.constraints().number_of_generations > 1
    }

    pub fn is_two_generation(self) -> bool {
        self.constraints().number_of_generations == 2
    }

    pub fn is_mark_sweep(self) -> bool {
        self == PolicyKind::MarkSweep
    }

    pub fn is_concurrent_mark_sweep(self) -> bool {
        matches!(
            self,
            PolicyKind::ConcurrentMarkSweep | PolicyKind::AdaptiveConcurrentMarkSweep
        )
    }

    pub fn is_adaptive(self) -> bool {
        self == PolicyKind::AdaptiveConcurrentMarkSweep
    }
}

/// Why an allocation could not be satisfied.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AllocationFailure {
    /// Collections are taking nearly all the time and freeing nearly nothing, so we stopped
    /// trying. The caller should report this as its own kind of out-of-memory.
    #[error("GC overhead limit exceeded")]
    GcOverheadLimitExceeded,
    /// The heap is exhausted.
    #[error("Out of memory")]
    OutOfMemory,
    /// Critical regions held off the collection that would have made room. The caller may retry,
    /// for example outside its TLAB.
    #[error("Allocation stalled by the GC locker")]
    GcLockerActive,
}

/// A collector policy decides the generation layout and sizes of a heap, and what to do when an
/// allocation fails.
///
/// A policy is created by [`crate::policy::create_policy`], initialized once with
/// [`CollectorPolicy::initialize_all`], and then shared by all mutator threads. The
/// initialization steps run in a fixed order: alignments, flags, size info, generations. Each step
/// relies on the ones before it.
pub trait CollectorPolicy: 'static + Send + Sync {
    fn constraints(&self) -> &'static PolicyConstraints;

    fn kind(&self) -> PolicyKind;

    fn base(&self) -> &BasePolicy;

    fn base_mut(&mut self) -> &mut BasePolicy;

    /// The generational part of this policy.
    fn generational(&self) -> Option<&GenPolicy> {
        None
    }

    /// The two-generation part of this policy.
    fn two_gen(&self) -> Option<&TwoGenPolicy> {
        None
    }

    /// Set the space, generation and heap alignments.
    fn initialize_alignments(&mut self);

    /// Validate the flags and make them consistent with each other and with the alignments.
    fn initialize_flags(&mut self) -> PolicyResult<()>;

    /// Compute the sizes of the heap (and the generations) from the flags.
    fn initialize_size_info(&mut self) -> PolicyResult<()>;

    /// Describe the generations the heap should build.
    fn initialize_generations(&mut self) -> PolicyResult<()> {
        Ok(())
    }

    /// Run every initialization step, in order. Returns an error if the configuration cannot be
    /// satisfied, or if the policy was already initialized.
    fn initialize_all(&mut self) -> PolicyResult<()> {
        if self.base().is_initialized() {
            return Err(PolicyError::AlreadyInitialized);
        }
        self.initialize_alignments();
        self.initialize_flags()?;
        self.initialize_size_info()?;
        self.initialize_generations()?;
        self.base_mut().set_initialized();
        info!(
            "Initialized {} policy: heap {}, alignments {}",
            self.kind(),
            self.base().heap_size_params(),
            self.base().alignments_or_default()
        );
        Ok(())
    }

    /// Called once the heap manager has built the heap, so the policy can pick up anything the
    /// heap adjusted.
    fn post_heap_initialize(&mut self, heap: &dyn CollectedHeap) -> PolicyResult<()> {
        let _ = heap;
        if self.base().is_initialized() {
            Ok(())
        } else {
            Err(PolicyError::NotInitialized)
        }
    }

    /// Allocate `word_size` words, collecting and expanding the heap as needed. Called by mutator
    /// threads after their fast path failed.
    fn mem_allocate_work(
        &self,
        heap: &dyn CollectedHeap,
        word_size: usize,
        is_tlab: bool,
    ) -> Result<Address, AllocationFailure>;

    /// Last-resort handling of a failed allocation, run inside a collection pause: collect,
    /// expand, and finally collect everything including soft references.
    fn satisfy_failed_allocation(
        &self,
        heap: &dyn CollectedHeap,
        word_size: usize,
        is_tlab: bool,
    ) -> Option<Address>;

    /// The barrier the heap must install for this policy.
    fn barrier_set_name(&self) -> BarrierKind {
        self.constraints().barrier
    }

    fn number_of_generations(&self) -> usize {
        self.constraints().number_of_generations
    }

    /// Whether the young generation has a soft end that can be moved while collecting
    /// incrementally.
    fn has_soft_ended_eden(&self) -> bool {
        false
    }

    fn size_policy(&self) -> Option<&AdaptiveSizePolicy> {
        self.base().size_policy()
    }

    fn space_alignment(&self) -> usize {
        self.base().alignments().space()
    }

    fn heap_alignment(&self) -> usize {
        self.base().alignments().heap()
    }

    fn initial_heap_byte_size(&self) -> usize {
        self.base().initial_heap_byte_size()
    }

    fn min_heap_byte_size(&self) -> usize {
        self.base().min_heap_byte_size()
    }

    fn max_heap_byte_size(&self) -> usize {
        self.base().max_heap_byte_size()
    }

    fn should_clear_all_soft_refs(&self) -> bool {
        self.base().should_clear_all_soft_refs()
    }

    fn set_should_clear_all_soft_refs(&self, v: bool) {
        self.base().set_should_clear_all_soft_refs(v)
    }

    fn use_should_clear_all_soft_refs(&self) -> bool {
        self.base().use_should_clear_all_soft_refs()
    }

    fn all_soft_refs_clear(&self) -> bool {
        self.base().all_soft_refs_clear()
    }

    fn set_all_soft_refs_clear(&self, v: bool) {
        self.base().set_all_soft_refs_clear(v)
    }

    fn cleared_all_soft_refs(&self) {
        self.base().cleared_all_soft_refs()
    }
}

/// Create the policy `options` select. The policy still has to be initialized.
pub fn create_policy(options: Arc<Options>) -> Box<dyn CollectorPolicy> {
    match options.effective_collector() {
        CollectorSelector::MarkSweep => {
            Box::new(crate::policy::marksweep::MarkSweepPolicy::new(options)) as Box<dyn CollectorPolicy>
        }
        CollectorSelector::ConcurrentMarkSweep => Box::new(
            crate::policy::cms::ConcurrentMarkSweepPolicy::new(options),
        ) as Box<dyn CollectorPolicy>,
        CollectorSelector::AdaptiveConcurrentMarkSweep => Box::new(
            crate::policy::cms::ConcurrentMarkSweepPolicy::new_adaptive(options),
        ) as Box<dyn CollectorPolicy>,
    }
}

/// State shared by all policies: the alignments, the heap size bounds, the effective flags and the
/// soft reference protocol.
pub struct BasePolicy {
    /// The options the policy was created with.
    pub options: Arc<Options>,
    /// Our copy of the options, adjusted while validating them.
    flags: Options,
    alignments: Option<AlignmentSet>,
    max_heap_size_cmdline: bool,
    /// Set by the policy to ask the next collection to clear all soft references.
    should_clear_all_soft_refs: AtomicBool,
    /// Set when the last collection cleared all soft references.
    all_soft_refs_clear: AtomicBool,
    size_policy: Option<AdaptiveSizePolicy>,
    initialized: bool,
}

impl BasePolicy {
    pub fn new(options: Arc<Options>) -> Self {
        BasePolicy {
            flags: (*options).clone(),
            options,
            alignments: None,
            max_heap_size_cmdline: false,
            should_clear_all_soft_refs: AtomicBool::new(false),
            all_soft_refs_clear: AtomicBool::new(false),
            size_policy: None,
            initialized: false,
        }
    }

    /// The effective flags.
    pub fn flags(&self) -> &Options {
        &self.flags
    }

    pub(crate) fn flags_mut(&mut self) -> &mut Options {
        &mut self.flags
    }

    pub fn set_alignments(&mut self, alignments: AlignmentSet) {
        self.alignments = Some(alignments);
    }

    /// The alignments. Only valid after `initialize_alignments`.
    pub fn alignments(&self) -> AlignmentSet {
        debug_assert!(self.alignments.is_some(), "Alignments have not been set");
        self.alignments_or_default()
    }

    fn alignments_or_default(&self) -> AlignmentSet {
        self.alignments
            .unwrap_or_else(|| AlignmentSet::new(BYTES_IN_PAGE, BYTES_IN_PAGE, BYTES_IN_PAGE))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn set_initialized(&mut self) {
        self.initialized = true;
    }

    pub fn min_heap_byte_size(&self) -> usize {
        *self.flags.min_heap_size
    }

    pub fn initial_heap_byte_size(&self) -> usize {
        *self.flags.initial_heap_size
    }

    pub fn max_heap_byte_size(&self) -> usize {
        *self.flags.max_heap_size
    }

    /// The heap size bounds.
    pub fn heap_size_params(&self) -> SizeParameters {
        SizeParameters::new(
            self.min_heap_byte_size(),
            self.initial_heap_byte_size(),
            self.max_heap_byte_size(),
        )
    }

    /// Whether the user set the maximum heap size.
    pub fn max_heap_size_cmdline(&self) -> bool {
        self.max_heap_size_cmdline
    }

    pub(crate) fn set_min_heap_byte_size(&mut self, size: usize) {
        self.flags.min_heap_size.set_ergo(size);
    }

    pub(crate) fn set_initial_heap_byte_size(&mut self, size: usize) {
        self.flags.initial_heap_size.set_ergo(size);
    }

    pub(crate) fn set_max_heap_byte_size(&mut self, size: usize) {
        self.flags.max_heap_size.set_ergo(size);
    }

    /// Fill in the heap sizes the user left for us to choose.
    fn apply_heap_ergonomics(&mut self) {
        let flags = &mut self.flags;
        let needs_physical_memory = *flags.max_heap_size == 0 || *flags.initial_heap_size == 0;
        let phys_mem = if needs_physical_memory {
            ergonomics::get_system_total_memory()
        } else {
            0
        };

        if *flags.max_heap_size == 0 {
            let mut reasonable_max = ergonomics::ergonomic_max_heap_size(phys_mem);
            // Keep the maximum consistent with the sizes the user asked for.
            if !flags.initial_heap_size.is_default() {
                reasonable_max = reasonable_max.max(*flags.initial_heap_size);
            }
            if !flags.min_heap_size.is_default() {
                reasonable_max = reasonable_max.max(*flags.min_heap_size);
            }
            debug!("Ergonomic maximum heap size: {}", bytes_to_formatted_string(reasonable_max));
            flags.max_heap_size.set_ergo(reasonable_max);
        }

        if *flags.initial_heap_size == 0 || *flags.min_heap_size == 0 {
            let reasonable_minimum = flags
                .new_size
                .saturating_add(*flags.old_size)
                .min(*flags.max_heap_size);
            if *flags.initial_heap_size == 0 {
                let initial = ergonomics::ergonomic_initial_heap_size(
                    phys_mem,
                    *flags.max_heap_size,
                    reasonable_minimum.max(*flags.min_heap_size),
                );
                debug!("Ergonomic initial heap size: {}", bytes_to_formatted_string(initial));
                flags.initial_heap_size.set_ergo(initial);
            }
            if *flags.min_heap_size == 0 {
                // An explicit initial size also sets the minimum.
                let min = if flags.initial_heap_size.is_explicit() {
                    *flags.initial_heap_size
                } else {
                    reasonable_minimum.min(*flags.initial_heap_size)
                };
                flags.min_heap_size.set_ergo(min);
            }
        }
    }

    /// Validate the heap size flags, and align them to the heap alignment.
    pub fn initialize_flags(&mut self) -> PolicyResult<()> {
        let alignments = self.alignments.ok_or(PolicyError::MissingAlignment)?;
        alignments.assert_valid();
        let heap_alignment = alignments.heap();

        self.apply_heap_ergonomics();
        let flags = &mut self.flags;

        if flags.max_heap_size.is_explicit() {
            if flags.initial_heap_size.is_explicit() && *flags.initial_heap_size > *flags.max_heap_size {
                return Err(PolicyError::InitialHeapExceedsMax {
                    initial: *flags.initial_heap_size,
                    max: *flags.max_heap_size,
                });
            }
            if *flags.min_heap_size != 0 && *flags.max_heap_size < *flags.min_heap_size {
                return Err(PolicyError::IncompatibleMinMaxHeap {
                    min: *flags.min_heap_size,
                    max: *flags.max_heap_size,
                });
            }
            self.max_heap_size_cmdline = true;
        }

        if *flags.initial_heap_size < MIN_HEAP_BYTES {
            return Err(PolicyError::HeapTooSmall {
                what: "initial",
                size: *flags.initial_heap_size,
                required: MIN_HEAP_BYTES,
            });
        }
        if *flags.min_heap_size < MIN_HEAP_BYTES {
            return Err(PolicyError::HeapTooSmall {
                what: "minimum",
                size: *flags.min_heap_size,
                required: MIN_HEAP_BYTES,
            });
        }

        // The user's sizes must be aligned. Rounding does not make them less explicit.
        let align = |size: usize| {
            raw_align_up_checked(size, heap_alignment).ok_or(PolicyError::SizeOverflow { what: "heap size" })
        };
        flags.min_heap_size.update(align(*flags.min_heap_size)?);
        flags.initial_heap_size.update(align(*flags.initial_heap_size)?);
        flags.max_heap_size.update(align(*flags.max_heap_size)?);

        if flags.initial_heap_size.is_explicit() && *flags.initial_heap_size < *flags.min_heap_size {
            return Err(PolicyError::IncompatibleMinInitialHeap {
                min: *flags.min_heap_size,
                initial: *flags.initial_heap_size,
            });
        }
        if !flags.initial_heap_size.is_default() && *flags.initial_heap_size > *flags.max_heap_size {
            let initial = *flags.initial_heap_size;
            flags.max_heap_size.set_ergo(initial);
        } else if !flags.max_heap_size.is_default() && *flags.initial_heap_size > *flags.max_heap_size {
            let max = *flags.max_heap_size;
            flags.initial_heap_size.set_ergo(max);
            if *flags.min_heap_size > max {
                flags.min_heap_size.set_ergo(max);
            }
        }

        if *flags.min_heap_size > *flags.max_heap_size {
            return Err(PolicyError::IncompatibleMinMaxHeap {
                min: *flags.min_heap_size,
                max: *flags.max_heap_size,
            });
        }

        let min_heap_delta = raw_align_up_checked(*flags.min_heap_delta_bytes, alignments.space())
            .ok_or(PolicyError::SizeOverflow { what: "minimum heap expansion" })?;
        flags.min_heap_delta_bytes.set_ergo(min_heap_delta);

        #[cfg(any(debug_assertions, feature = "extreme_assertions"))]
        self.assert_flags();
        Ok(())
    }

    pub fn initialize_size_info(&mut self) -> PolicyResult<()> {
        debug!("Minimum heap {}", bytes_to_formatted_string(self.min_heap_byte_size()));
        debug!("Initial heap {}", bytes_to_formatted_string(self.initial_heap_byte_size()));
        debug!("Maximum heap {}", bytes_to_formatted_string(self.max_heap_byte_size()));

        #[cfg(any(debug_assertions, feature = "extreme_assertions"))]
        self.assert_size_info();
        Ok(())
    }

    pub fn assert_flags(&self) {
        let heap_alignment = self.alignments().heap();
        assert!(
            *self.flags.initial_heap_size <= *self.flags.max_heap_size,
            "Ergonomics decided on incompatible initial and maximum heap sizes"
        );
        assert!(raw_is_aligned(*self.flags.initial_heap_size, heap_alignment), "Initial heap size alignment");
        assert!(raw_is_aligned(*self.flags.max_heap_size, heap_alignment), "Maximum heap size alignment");
    }

    pub fn assert_size_info(&self) {
        let heap = self.heap_size_params();
        assert!(
            self.min_heap_byte_size() <= self.initial_heap_byte_size()
                && self.initial_heap_byte_size() <= self.max_heap_byte_size(),
            "Ergonomics decided on incompatible heap sizes: {}",
            heap
        );
        assert!(heap.is_aligned_to(self.alignments().heap()), "Heap sizes {} are not aligned", heap);
    }

    /* Soft references */

    pub fn should_clear_all_soft_refs(&self) -> bool {
        self.should_clear_all_soft_refs.load(Ordering::SeqCst)
    }

    pub fn set_should_clear_all_soft_refs(&self, v: bool) {
        self.should_clear_all_soft_refs.store(v, Ordering::SeqCst);
    }

    /// Read and reset the request to clear all soft references, so that a collector honors it
    /// exactly once.
    pub fn use_should_clear_all_soft_refs(&self) -> bool {
        self.should_clear_all_soft_refs.swap(false, Ordering::SeqCst)
    }

    pub fn all_soft_refs_clear(&self) -> bool {
        self.all_soft_refs_clear.load(Ordering::SeqCst)
    }

    pub fn set_all_soft_refs_clear(&self, v: bool) {
        self.all_soft_refs_clear.store(v, Ordering::SeqCst);
    }

    /// A collection has cleared all soft references. If the GC overhead limit is near, ask the
    /// next collection to clear them again.
    pub fn cleared_all_soft_refs(&self) {
        let near = self
            .size_policy
            .as_ref()
            .is_some_and(|policy| policy.gc_overhead_limit_near());
        self.set_should_clear_all_soft_refs(near);
        self.set_all_soft_refs_clear(true);
    }

    /* Adaptive sizing */

    pub fn size_policy(&self) -> Option<&AdaptiveSizePolicy> {
        self.size_policy.as_ref()
    }

    /// Create the adaptive size policy from the initial generation sizes.
    pub fn initialize_size_policy(
        &mut self,
        init_eden_size: usize,
        init_promo_size: usize,
        init_survivor_size: usize,
    ) {
        debug_assert!(self.size_policy.is_none(), "Size policy is already initialized");
        self.size_policy = Some(AdaptiveSizePolicy::new(
            init_eden_size,
            init_promo_size,
            init_survivor_size,
            *self.flags.gc_time_ratio,
            crate::util::heap::OverheadLimits::from_options(&self.flags),
        ));
    }
}

/// Acknowledges, when dropped, that a collection cleared all soft references.
///
/// Create one before a collection that may clear soft references. However the collection ends,
/// the policy is told exactly once.
pub struct ClearedAllSoftRefs<'a> {
    clear_all_soft_refs: bool,
    policy: &'a BasePolicy,
}

impl<'a> ClearedAllSoftRefs<'a> {
    pub fn new(clear_all_soft_refs: bool, policy: &'a BasePolicy) -> Self {
        ClearedAllSoftRefs {
            clear_all_soft_refs,
            policy,
        }
    }

    pub fn should_clear(&self) -> bool {
        self.clear_all_soft_refs
    }
}

impl Drop for ClearedAllSoftRefs<'_> {
    fn drop(&mut self) {
        if self.clear_all_soft_refs {
            self.policy.cleared_all_soft_refs();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::heap::alignment::generational_alignments;

    fn base_with(options: &str) -> BasePolicy {
        let mut opts = Options::default();
        assert!(opts.set_bulk_from_str(options));
        let mut base = BasePolicy::new(Arc::new(opts));
        let alignments = generational_alignments(base.flags());
        base.set_alignments(alignments);
        base
    }

    #[test]
    fn soft_ref_flag_is_used_once() {
        let base = base_with("max_heap_size=64m initial_heap_size=64m");
        base.set_should_clear_all_soft_refs(true);
        assert!(base.use_should_clear_all_soft_refs());
        assert!(!base.use_should_clear_all_soft_refs());
    }

    #[test]
    fn guard_acknowledges_once() {
        let base = base_with("max_heap_size=64m initial_heap_size=64m");
        base.set_should_clear_all_soft_refs(true);
        {
            let _guard = ClearedAllSoftRefs::new(true, &base);
            assert!(!base.all_soft_refs_clear());
        }
        assert!(base.all_soft_refs_clear());
        assert!(!base.should_clear_all_soft_refs());

        base.set_all_soft_refs_clear(false);
        {
            let guard = ClearedAllSoftRefs::new(false, &base);
            assert!(!guard.should_clear());
        }
        assert!(!base.all_soft_refs_clear());
    }

    #[test]
    fn guard_acknowledges_on_unwind() {
        let base = base_with("max_heap_size=64m initial_heap_size=64m");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ClearedAllSoftRefs::new(true, &base);
            panic!("collection failed");
        }));
        assert!(result.is_err());
        assert!(base.all_soft_refs_clear());
    }

    #[test]
    fn near_overhead_limit_keeps_clearing() {
        let mut base = base_with("max_heap_size=64m initial_heap_size=64m gc_overhead_limit_threshold=1");
        base.initialize_size_policy(BYTES_IN_MBYTE, BYTES_IN_MBYTE, BYTES_IN_KBYTE);
        base.cleared_all_soft_refs();
        assert!(base.should_clear_all_soft_refs());
        assert!(base.all_soft_refs_clear());
    }

    #[test]
    fn flags_need_alignments() {
        let mut base = BasePolicy::new(Arc::new(Options::default()));
        assert_eq!(base.initialize_flags(), Err(PolicyError::MissingAlignment));
    }

    #[test]
    fn heap_sizes_are_aligned_up() {
        let mut base = base_with("max_heap_size=65m initial_heap_size=33m min_heap_size=9m");
        base.initialize_flags().unwrap();
        let heap_alignment = base.alignments().heap();
        assert_eq!(base.max_heap_byte_size(), raw_align_up(65 * BYTES_IN_MBYTE, heap_alignment));
        assert_eq!(base.initial_heap_byte_size(), raw_align_up(33 * BYTES_IN_MBYTE, heap_alignment));
        assert_eq!(base.min_heap_byte_size(), raw_align_up(9 * BYTES_IN_MBYTE, heap_alignment));
        assert!(base.flags().initial_heap_size.is_explicit());
        assert!(base.max_heap_size_cmdline());
        assert_eq!(*base.flags().min_heap_delta_bytes % base.alignments().space(), 0);
    }

    #[test]
    fn initial_larger_than_max() {
        let mut base = base_with("max_heap_size=64m initial_heap_size=128m");
        assert_eq!(
            base.initialize_flags(),
            Err(PolicyError::InitialHeapExceedsMax {
                initial: 128 * BYTES_IN_MBYTE,
                max: 64 * BYTES_IN_MBYTE
            })
        );
    }

    #[test]
    fn max_smaller_than_min() {
        let mut base = base_with("max_heap_size=64m min_heap_size=128m");
        assert!(matches!(
            base.initialize_flags(),
            Err(PolicyError::IncompatibleMinMaxHeap { .. })
        ));
    }

    #[test]
    fn initial_smaller_than_min() {
        let mut base = base_with("max_heap_size=64m min_heap_size=32m initial_heap_size=16m");
        assert!(matches!(
            base.initialize_flags(),
            Err(PolicyError::IncompatibleMinInitialHeap { .. })
        ));
    }

    #[test]
    fn heap_too_small() {
        let mut base = base_with("max_heap_size=64m initial_heap_size=512k");
        assert!(matches!(
            base.initialize_flags(),
            Err(PolicyError::HeapTooSmall { what: "initial", .. })
        ));
    }

    #[test]
    fn explicit_initial_raises_ergonomic_max() {
        let mut base = base_with("initial_heap_size=64g");
        base.initialize_flags().unwrap();
        assert_eq!(base.max_heap_byte_size(), 64 * BYTES_IN_GBYTE);
        assert_eq!(base.min_heap_byte_size(), 64 * BYTES_IN_GBYTE);
        assert!(base.flags().max_heap_size.is_ergonomic());
    }

    #[test]
    fn explicit_min_raises_ergonomic_max() {
        let mut base = base_with("min_heap_size=64g");
        base.initialize_flags().unwrap();
        assert_eq!(base.min_heap_byte_size(), 64 * BYTES_IN_GBYTE);
        assert_eq!(base.initial_heap_byte_size(), 64 * BYTES_IN_GBYTE);
        assert_eq!(base.max_heap_byte_size(), 64 * BYTES_IN_GBYTE);
        assert!(base.flags().max_heap_size.is_ergonomic());
    }

    #[test]
    fn unalignable_heap_size() {
        let mut base = base_with(&format!("max_heap_size={}", usize::MAX));
        assert_eq!(
            base.initialize_flags(),
            Err(PolicyError::SizeOverflow { what: "heap size" })
        );
    }

    #[test]
    fn policy_kinds() {
        assert!(PolicyKind::MarkSweep.is_mark_sweep());
        assert!(!PolicyKind::MarkSweep.is_concurrent_mark_sweep());
        assert!(PolicyKind::AdaptiveConcurrentMarkSweep.is_concurrent_mark_sweep());
        assert!(PolicyKind::AdaptiveConcurrentMarkSweep.is_adaptive());
        assert!(PolicyKind::ConcurrentMarkSweep.is_two_generation());
        assert!(PolicyKind::ConcurrentMarkSweep.is_generational());
        assert!(PolicyKind::AdaptiveConcurrentMarkSweep.constraints().adaptive_sizing);
        assert!(!PolicyKind::MarkSweep.constraints().concurrent_old_generation);
    }

    #[test]
    fn policy_kind_matches_policy_constraints() {
        for options in [
            "collector=MarkSweep",
            "collector=ConcurrentMarkSweep",
            "collector=ConcurrentMarkSweep use_adaptive_size_policy=true",
        ] {
            let mut opts = Options::default();
            assert!(opts.set_bulk_from_str(options));
            let policy = create_policy(Arc::new(opts));
            let constraints = policy.kind().constraints();
            assert_eq!(constraints.number_of_generations, policy.constraints().number_of_generations);
            assert_eq!(constraints.adaptive_sizing, policy.constraints().adaptive_sizing);
            assert_eq!(policy.kind().is_two_generation(), policy.number_of_generations() == 2);
        }
    }
}
