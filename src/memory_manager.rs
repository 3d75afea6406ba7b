//! Runtime-to-genheap interface: safe Rust APIs.
//!
//! We expect a runtime to set up a policy in the following steps:
//!
//! 1. Create a [`PolicyBuilder`] instance.
//! 2. Set options with [`process()`] or [`process_bulk()`].
//! 3. Create the policy with [`init_policy()`]. This validates the options and computes every
//!    generation size, so configuration errors surface here.
//! 4. Build the heap from the generation specs the policy describes, then call
//!    [`post_heap_init()`] so the policy can pick up what the heap adjusted.
//! 5. Allocate with [`alloc()`] once a thread's own fast path fails.

use crate::builder::PolicyBuilder;
use crate::error::PolicyResult;
use crate::policy::{AllocationFailure, CollectorPolicy};
use crate::util::Address;
use crate::vm::CollectedHeap;

/// Create and initialize the policy selected by `builder`.
///
/// This attempts to initialize a logger. A runtime that wants its own logger should install it
/// before calling this.
pub fn init_policy(builder: &PolicyBuilder) -> PolicyResult<Box<dyn CollectorPolicy>> {
    match crate::util::logger::try_init() {
        Ok(_) => debug!("genheap initialized the logger."),
        Err(_) => debug!("genheap failed to initialize the logger. Possibly a logger has been initialized by user."),
    }
    info!("genheap {}", *crate::build_info::GENHEAP_FULL_BUILD_INFO);
    builder.build()
}

/// Reconcile the policy with the heap built from it.
pub fn post_heap_init(policy: &mut dyn CollectorPolicy, heap: &dyn CollectedHeap) -> PolicyResult<()> {
    policy.post_heap_initialize(heap)
}

/// Process a run-time option. Returns true if the option is processed successfully.
///
/// Arguments:
/// * `builder`: The policy builder.
/// * `name`: The name of the option.
/// * `value`: The value of the option (as a string).
pub fn process(builder: &mut PolicyBuilder, name: &str, value: &str) -> bool {
    builder.set_option(name, value)
}

/// Process multiple run-time options. Returns true if all the options are processed successfully.
///
/// Arguments:
/// * `builder`: The policy builder.
/// * `options`: key value pairs separated by white spaces, e.g. "max_heap_size=256m new_ratio=3"
pub fn process_bulk(builder: &mut PolicyBuilder, options: &str) -> bool {
    builder.set_options_bulk_by_str(options)
}

/// Allocate `word_size` words in `heap`, collecting or growing it as needed.
///
/// Arguments:
/// * `policy`: The initialized policy.
/// * `heap`: The heap built from the policy.
/// * `word_size`: The request in words.
/// * `is_tlab`: Whether this is a thread-local allocation buffer rather than an object.
pub fn alloc(
    policy: &dyn CollectorPolicy,
    heap: &dyn CollectedHeap,
    word_size: usize,
    is_tlab: bool,
) -> Result<Address, AllocationFailure> {
    debug_assert!(policy.base().is_initialized(), "Allocating with an uninitialized policy");
    policy.mem_allocate_work(heap, word_size, is_tlab)
}
