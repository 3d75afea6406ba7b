//! The heap manager, as seen by a policy.
//!
//! The heap manager owns the generations and runs collections. The policy decides where an
//! allocation goes, when to collect and when to grow. Generations and the heap do their own
//! synchronization: the policy calls these methods from any mutator thread without holding a lock.

use crate::policy::generational::GenerationKind;
use crate::util::gc_cause::GcCause;
use crate::util::Address;
use enum_map::Enum;

/// One generation, as built by the heap manager from a
/// [`GenerationSpec`](crate::policy::generational::GenerationSpec).
pub trait Generation: Send + Sync {
    /// Which generation this is.
    fn kind(&self) -> GenerationKind;

    /// Committed bytes.
    fn capacity(&self) -> usize;

    /// Reserved bytes. The generation never grows beyond this.
    fn reserved(&self) -> usize;

    /// Whether this generation wants to serve an allocation of `word_size` words. A young
    /// generation typically refuses requests that are too large to copy around.
    fn should_allocate(&self, word_size: usize, is_tlab: bool) -> bool;

    /// Allocate `word_size` words. The caller serializes against collection.
    fn allocate(&self, word_size: usize, is_tlab: bool) -> Option<Address>;

    /// Allocate `word_size` words without taking the heap lock. Generations that cannot do this
    /// return `None`.
    fn par_allocate(&self, word_size: usize, is_tlab: bool) -> Option<Address> {
        let _ = (word_size, is_tlab);
        None
    }

    /// Commit `bytes` more. Returns false if the generation cannot grow by that much.
    fn expand(&self, bytes: usize) -> bool;

    /// Whether all reserved memory is committed.
    fn is_maximal_no_gc(&self) -> bool {
        self.capacity() >= self.reserved()
    }
}

/// What a policy asks the heap to collect.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CollectionRequest {
    pub cause: GcCause,
    /// Collect every generation up to `max_generation`, rather than letting the heap start with
    /// the young generation and stop when enough is free.
    pub full: bool,
    /// Clear all soft references.
    pub clear_all_soft_refs: bool,
    /// The allocation that triggered the collection, in words. 0 if none.
    pub word_size: usize,
    pub is_tlab: bool,
    /// The oldest generation to collect.
    pub max_generation: GenerationKind,
}

/// How a collection pause requested through [`CollectedHeap::collect_for_allocation`] went.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// Another thread collected since the caller sampled the collection count. Nothing ran.
    Skipped,
    /// The GC locker was held, so nothing was collected.
    GcLocked,
    /// The pause ran. This is the result of the allocation done inside it.
    Completed(Option<Address>),
}

pub trait CollectedHeap: Send + Sync {
    /// The generation of the given kind.
    fn generation(&self, kind: GenerationKind) -> &dyn Generation;

    /// Committed bytes over all generations.
    fn capacity(&self) -> usize {
        (0..GenerationKind::LENGTH)
            .map(|i| self.generation(GenerationKind::from_usize(i)).capacity())
            .sum()
    }

    /// Whether every generation is fully committed.
    fn is_maximal_no_gc(&self) -> bool {
        (0..GenerationKind::LENGTH).all(|i| self.generation(GenerationKind::from_usize(i)).is_maximal_no_gc())
    }

    /// The number of collections so far.
    fn total_collections(&self) -> usize;

    /// Some thread is in a critical region that blocks collection, and a collection is wanted.
    fn gc_locker_is_active_and_needs_gc(&self) -> bool;

    /// Whether the current thread is in such a critical region.
    fn gc_locker_held_by_current_thread(&self) -> bool;

    /// Block until the GC locker is released and the collection it held back has run.
    fn gc_locker_stall_until_clear(&self);

    /// Whether a young collection now would fail to promote everything it has to.
    fn incremental_collection_will_fail(&self, consult_young: bool) -> bool;

    /// Whether the last young collection failed to promote.
    fn incremental_collection_failed(&self) -> bool;

    /// Run a collection. Called from inside a pause started by
    /// [`CollectedHeap::collect_for_allocation`].
    fn do_collection(&self, request: &CollectionRequest);

    /// Stop the mutators and, unless another collection happened since `gc_count_before`, run
    /// `satisfy` inside the pause. `satisfy` collects and allocates.
    fn collect_for_allocation(
        &self,
        gc_count_before: usize,
        satisfy: &mut dyn FnMut() -> Option<Address>,
    ) -> CollectionOutcome;
}
