//! genheap is a generational heap sizing and collector policy engine for managed runtimes.
//!
//! It decides how a heap is split into a young and an old generation, how large each generation
//! is allowed to be (minimum, initial and maximum sizes, kept consistent under alignment
//! constraints), and what to do when an allocation fails: try older generations, collect, grow
//! the heap, and finally clear soft references before giving up.
//!
//! The collectors themselves are not part of this crate. A runtime implements
//! [`vm::CollectedHeap`] and [`vm::Generation`] over its own generations, and calls the policy
//! through [`memory_manager`].
//!
//! Logging goes through the `log` facade. See [`util::logger`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate static_assertions;

pub mod build_info;
pub mod builder;
pub mod error;
pub mod memory_manager;
pub mod policy;
pub mod util;
pub mod vm;

pub use crate::builder::PolicyBuilder;
pub use crate::error::{PolicyError, PolicyResult};
pub use crate::policy::{create_policy, AllocationFailure, CollectorPolicy, PolicyKind};
