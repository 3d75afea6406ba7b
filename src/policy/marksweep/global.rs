use crate::error::PolicyResult;
use crate::policy::generational::global::GenPolicy;
use crate::policy::generational::two_gen::TwoGenPolicy;
use crate::policy::generational::{GenerationName, TWO_GEN_CONSTRAINTS};
use crate::policy::global::{AllocationFailure, BasePolicy, CollectorPolicy, PolicyKind};
use crate::policy::policy_constraints::PolicyConstraints;
use crate::util::heap::alignment::generational_alignments;
use crate::util::options::Options;
use crate::util::Address;
use crate::vm::CollectedHeap;
use std::sync::Arc;

pub struct MarkSweepPolicy {
    pub two_gen: TwoGenPolicy,
}

/// The policy constraints for the mark-sweep policy.
pub const MS_CONSTRAINTS: PolicyConstraints = TWO_GEN_CONSTRAINTS;

impl MarkSweepPolicy {
    pub fn new(options: Arc<Options>) -> Self {
        MarkSweepPolicy {
            two_gen: TwoGenPolicy::new(options),
        }
    }

    fn young_generation_name(&self) -> GenerationName {
        if *self.base().flags().use_par_new_gc {
            GenerationName::ParNew
        } else {
            GenerationName::DefNew
        }
    }
}

impl CollectorPolicy for MarkSweepPolicy {
    fn constraints(&self) -> &'static PolicyConstraints {
        &MS_CONSTRAINTS
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::MarkSweep
    }

    fn base(&self) -> &BasePolicy {
        &self.two_gen.gen.base
    }

    fn base_mut(&mut self) -> &mut BasePolicy {
        &mut self.two_gen.gen.base
    }

    fn generational(&self) -> Option<&GenPolicy> {
        Some(&self.two_gen.gen)
    }

    fn two_gen(&self) -> Option<&TwoGenPolicy> {
        Some(&self.two_gen)
    }

    fn initialize_alignments(&mut self) {
        let alignments = generational_alignments(self.base().flags());
        self.base_mut().set_alignments(alignments);
    }

    fn initialize_flags(&mut self) -> PolicyResult<()> {
        self.two_gen.initialize_flags()
    }

    fn initialize_size_info(&mut self) -> PolicyResult<()> {
        self.two_gen.initialize_size_info()
    }

    fn initialize_generations(&mut self) -> PolicyResult<()> {
        let generations = self
            .two_gen
            .generations_spec(self.young_generation_name(), GenerationName::MarkSweepCompact);
        self.two_gen.gen.set_generations(generations);
        Ok(())
    }

    fn post_heap_initialize(&mut self, heap: &dyn CollectedHeap) -> PolicyResult<()> {
        self.two_gen.post_heap_initialize(heap)
    }

    fn mem_allocate_work(
        &self,
        heap: &dyn CollectedHeap,
        word_size: usize,
        is_tlab: bool,
    ) -> Result<Address, AllocationFailure> {
        self.two_gen.gen.mem_allocate_work(heap, word_size, is_tlab)
    }

    fn satisfy_failed_allocation(
        &self,
        heap: &dyn CollectedHeap,
        word_size: usize,
        is_tlab: bool,
    ) -> Option<Address> {
        self.two_gen.gen.satisfy_failed_allocation(heap, word_size, is_tlab)
    }
}
