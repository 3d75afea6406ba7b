//! The interface a heap manager implements for the policies.

mod heap;

pub use self::heap::{CollectedHeap, CollectionOutcome, CollectionRequest, Generation};
