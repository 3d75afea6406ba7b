//! Collector policies.
//!
//! A policy decides how a heap is laid out in generations, how large each generation is allowed
//! to be, and what happens when an allocation fails. Generally a policy consists of:
//! * A policy type that implements the [`CollectorPolicy`](crate::policy::global::CollectorPolicy)
//!   trait. It composes the shared state of its family:
//!   [`BasePolicy`](crate::policy::global::BasePolicy) inside
//!   [`GenPolicy`](crate::policy::generational::GenPolicy) inside
//!   [`TwoGenPolicy`](crate::policy::generational::TwoGenPolicy), and forwards to it.
//! * A constant for [`PolicyConstraints`](crate::policy::policy_constraints::PolicyConstraints),
//!   which defines policy-specific constants such as the barrier the heap must install.

pub mod barriers;
pub mod global;
pub mod policy_constraints;

pub use self::global::create_policy;
pub use self::global::AllocationFailure;
pub use self::global::BasePolicy;
pub use self::global::ClearedAllSoftRefs;
pub use self::global::CollectorPolicy;
pub use self::global::PolicyKind;
pub use self::policy_constraints::PolicyConstraints;

pub mod cms;
pub mod generational;
pub mod marksweep;
