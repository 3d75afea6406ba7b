use crate::error::PolicyResult;
use crate::policy::generational::global::GenPolicy;
use crate::policy::generational::two_gen::TwoGenPolicy;
use crate::policy::generational::{GenerationName, SpaceLayout, TWO_GEN_CONSTRAINTS};
use crate::policy::global::{AllocationFailure, BasePolicy, CollectorPolicy, PolicyKind};
use crate::policy::policy_constraints::PolicyConstraints;
use crate::util::heap::alignment::generational_alignments;
use crate::util::options::Options;
use crate::util::Address;
use crate::vm::CollectedHeap;
use std::sync::Arc;

/// The concurrent mark-sweep policy. The same type serves the adaptive variant, which differs in
/// the generations it asks for and in feeding an adaptive size policy.
pub struct ConcurrentMarkSweepPolicy {
    pub two_gen: TwoGenPolicy,
    adaptive: bool,
}

/// The policy constraints for the concurrent mark-sweep policy.
pub const CMS_CONSTRAINTS: PolicyConstraints = PolicyConstraints {
    concurrent_old_generation: true,
    always_do_update_barrier: true,
    ..TWO_GEN_CONSTRAINTS
};

/// The policy constraints for the adaptive concurrent mark-sweep policy.
pub const ADAPTIVE_CMS_CONSTRAINTS: PolicyConstraints = PolicyConstraints {
    adaptive_sizing: true,
    ..CMS_CONSTRAINTS
};

impl ConcurrentMarkSweepPolicy {
    pub fn new(options: Arc<Options>) -> Self {
        ConcurrentMarkSweepPolicy {
            two_gen: TwoGenPolicy::new(options),
            adaptive: false,
        }
    }

    pub fn new_adaptive(options: Arc<Options>) -> Self {
        ConcurrentMarkSweepPolicy {
            two_gen: TwoGenPolicy::new(options),
            adaptive: true,
        }
    }

    fn generation_names(&self) -> (GenerationName, GenerationName) {
        if self.adaptive {
            (GenerationName::ASParNew, GenerationName::ASConcurrentMarkSweep)
        } else if *self.base().flags().use_par_new_gc {
            (GenerationName::ParNew, GenerationName::ConcurrentMarkSweep)
        } else {
            (GenerationName::DefNew, GenerationName::ConcurrentMarkSweep)
        }
    }
}

impl CollectorPolicy for ConcurrentMarkSweepPolicy {
    fn constraints(&self) -> &'static PolicyConstraints {
        if self.adaptive {
            &ADAPTIVE_CMS_CONSTRAINTS
        } else {
            &CMS_CONSTRAINTS
        }
    }

    fn kind(&self) -> PolicyKind {
        if self.adaptive {
            PolicyKind::AdaptiveConcurrentMarkSweep
        } else {
            PolicyKind::ConcurrentMarkSweep
        }
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
        let (young, old) = self.generation_names();
        let generations = self.two_gen.generations_spec(young, old);
        if self.adaptive {
            // Start the size policy from the layout the heap will be built with.
            let (eden, survivor) = match generations.youngest().layout {
                SpaceLayout::EdenSurvivor { eden, survivor } => (eden, survivor),
                SpaceLayout::Contiguous => (generations.youngest().size.initial(), 0),
            };
            let promo = generations.oldest().size.initial();
            self.base_mut().initialize_size_policy(eden, promo, survivor);
        }
        self.two_gen.gen.set_generations(generations);
        Ok(())
    }

    fn post_heap_initialize(&mut self, heap: &dyn CollectedHeap) -> PolicyResult<()> {
        self.two_gen.post_heap_initialize(heap)
    }

    fn has_soft_ended_eden(&self) -> bool {
        *self.base().flags().cms_incremental_mode
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::barriers::BarrierKind;
    use crate::util::constants::*;
    use crate::util::conversions::raw_align_down;

    fn options(s: &str) -> Arc<Options> {
        let mut opts = Options::default();
        assert!(opts.set_bulk_from_str(s));
        Arc::new(opts)
    }

    #[test]
    fn cms_generations() {
        let mut cms = ConcurrentMarkSweepPolicy::new(options("max_heap_size=64m initial_heap_size=64m"));
        cms.initialize_all().unwrap();
        assert_eq!(cms.kind(), PolicyKind::ConcurrentMarkSweep);
        let generations = cms.generational().and_then(|gen| gen.generations()).unwrap();
        assert_eq!(generations.youngest().name, GenerationName::DefNew);
        assert_eq!(generations.oldest().name, GenerationName::ConcurrentMarkSweep);
        assert_eq!(cms.barrier_set_name(), BarrierKind::CardTableModRef);
        assert!(cms.constraints().always_do_update_barrier);
        assert!(cms.size_policy().is_none());
        assert!(!cms.has_soft_ended_eden());
    }

    #[test]
    fn incremental_mode_has_soft_ended_eden() {
        let cms = ConcurrentMarkSweepPolicy::new(options("max_heap_size=64m cms_incremental_mode=true"));
        assert!(cms.has_soft_ended_eden());
    }

    #[test]
    fn adaptive_cms_wires_size_policy() {
        let mut cms = ConcurrentMarkSweepPolicy::new_adaptive(options(
            "max_heap_size=96m initial_heap_size=96m use_large_pages=true large_page_size=1m",
        ));
        cms.initialize_all().unwrap();
        assert_eq!(cms.kind(), PolicyKind::AdaptiveConcurrentMarkSweep);
        assert!(cms.constraints().adaptive_sizing);

        let generations = cms.generational().and_then(|gen| gen.generations()).unwrap();
        assert_eq!(generations.youngest().name, GenerationName::ASParNew);
        assert_eq!(generations.oldest().name, GenerationName::ASConcurrentMarkSweep);

        // Young 32M: two survivors of a tenth each, rounded to 64K.
        let survivor = raw_align_down(32 * BYTES_IN_MBYTE / 10, GEN_GRAIN);
        let size_policy = cms.size_policy().unwrap();
        assert_eq!(size_policy.survivor_size(), survivor);
        assert_eq!(size_policy.eden_size(), 32 * BYTES_IN_MBYTE - 2 * survivor);
        assert_eq!(size_policy.promo_size(), 64 * BYTES_IN_MBYTE);
    }
}
