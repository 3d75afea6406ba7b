//! The barrier contract.
//!
//! A barrier intercepts heap reads and writes so that the collector can keep its invariants,
//! for example a card table that remembers old-to-young pointers. Policies only name the kind of
//! barrier their generation layout needs, and the heap manager builds a matching [`BarrierSet`].

use crate::util::Address;
use std::fmt;

/// The kinds of barrier set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BarrierKind {
    /// Remembers modified references.
    ModRef,
    /// Card-table-based [`BarrierKind::ModRef`]. This is what the two-generation policies need.
    CardTableModRef,
    /// A card table with extra cards for parallel old collection.
    CardTableExtension,
    /// Snapshot-at-the-beginning marking on top of a card table.
    G1SATBCT,
    /// [`BarrierKind::G1SATBCT`] that also logs dirty cards.
    G1SATBCTLogging,
    /// Anything else.
    Other,
    /// Not yet decided.
    Uninit,
}

impl BarrierKind {
    /// The kind this kind refines, if any.
    pub fn parent(self) -> Option<BarrierKind> {
        match self {
            BarrierKind::CardTableModRef => Some(BarrierKind::ModRef),
            BarrierKind::CardTableExtension => Some(BarrierKind::CardTableModRef),
            BarrierKind::G1SATBCT => Some(BarrierKind::CardTableModRef),
            BarrierKind::G1SATBCTLogging => Some(BarrierKind::G1SATBCT),
            BarrierKind::ModRef | BarrierKind::Other | BarrierKind::Uninit => None,
        }
    }

    /// Whether a barrier of this kind can be used where `other` is required.
    pub fn is_a(self, other: BarrierKind) -> bool {
        let mut kind = Some(self);
        while let Some(k) = kind {
            if k == other {
                return true;
            }
            kind = k.parent();
        }
        false
    }
}

/// A contiguous range of the heap, `[start, start + byte_size)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemRegion {
    pub start: Address,
    pub byte_size: usize,
}

impl MemRegion {
    pub fn new(start: Address, byte_size: usize) -> Self {
        MemRegion { start, byte_size }
    }

    pub fn end(&self) -> Address {
        self.start + self.byte_size
    }

    pub fn is_empty(&self) -> bool {
        self.byte_size == 0
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.start <= addr && addr < self.end()
    }
}

impl fmt::Display for MemRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

/// What a barrier implementation provides.
///
/// The `has_*` queries let a compiler or interpreter skip barriers that do nothing. The
/// `write_ref_field_*` methods are the slow paths. `*_work` is what an implementation overrides;
/// callers use the wrappers.
pub trait BarrierSet: Send + Sync {
    fn kind(&self) -> BarrierKind;

    fn is_a(&self, kind: BarrierKind) -> bool {
        self.kind().is_a(kind)
    }

    fn has_read_ref_barrier(&self) -> bool;
    fn has_read_prim_barrier(&self) -> bool;
    fn has_write_ref_barrier(&self) -> bool;
    fn has_write_ref_pre_barrier(&self) -> bool {
        false
    }
    fn has_write_prim_barrier(&self) -> bool;

    fn read_ref_needs_barrier(&self, field: Address) -> bool;
    fn read_prim_needs_barrier(&self, field: Address, bytes: usize) -> bool;
    fn write_prim_needs_barrier(&self, field: Address, bytes: usize) -> bool;

    /// Invoke the barrier before a reference field is overwritten with `new_val`.
    fn write_ref_field_pre(&self, field: Address, new_val: Address) {
        if self.has_write_ref_pre_barrier() {
            self.write_ref_field_pre_work(field, new_val);
        }
    }

    fn write_ref_field_pre_work(&self, _field: Address, _new_val: Address) {}

    /// Invoke the barrier after a reference field was overwritten with `new_val`.
    fn write_ref_field(&self, field: Address, new_val: Address) {
        if self.has_write_ref_barrier() {
            self.write_ref_field_work(field, new_val);
        }
    }

    fn write_ref_field_work(&self, field: Address, new_val: Address);

    /// Invoke the barrier after the references in `region` were written in bulk.
    fn write_ref_array(&self, region: MemRegion) {
        if !region.is_empty() {
            self.write_ref_array_work(region);
        }
    }

    fn write_ref_array_work(&self, region: MemRegion);

    /// Invoke the barrier after everything in `region` was written.
    fn write_region(&self, region: MemRegion) {
        if !region.is_empty() {
            self.write_region_work(region);
        }
    }

    fn write_region_work(&self, region: MemRegion);

    /// The heap covered by the barrier changed. Only the start of a covered region is fixed.
    fn resize_covered_region(&self, new_region: MemRegion);

    /// Whether `addr` is aligned as the barrier needs, for example to a card boundary.
    fn is_aligned(&self, addr: Address) -> bool;
}
