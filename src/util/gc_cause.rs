//! Why a collection was requested.

use strum_macros::{Display, EnumIter};

/// The reason attached to every collection request. The display string is what we log.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumIter)]
pub enum GcCause {
    /* requested from outside the collector */
    #[strum(serialize = "User Requested")]
    UserRequested,
    #[strum(serialize = "Full GC Alot")]
    FullGcAlot,
    #[strum(serialize = "Scavenge Alot")]
    ScavengeAlot,
    #[strum(serialize = "Allocation Profiler")]
    AllocationProfiler,
    #[strum(serialize = "Tool Force GC")]
    ToolForceGc,
    #[strum(serialize = "GCLocker Initiated GC")]
    GcLocker,
    #[strum(serialize = "Heap Inspection Initiated GC")]
    HeapInspection,
    #[strum(serialize = "Heap Dump Initiated GC")]
    HeapDump,

    /* reserved for collector use */
    #[strum(serialize = "No GC")]
    NoGc,
    #[strum(serialize = "Unknown GCCause")]
    NoCauseSpecified,
    #[strum(serialize = "Allocation Failure")]
    AllocationFailure,

    /* collector specific */
    #[strum(serialize = "Tenured Generation Full")]
    TenuredGenerationFull,
    #[strum(serialize = "Metadata GC Threshold")]
    MetadataGcThreshold,
    #[strum(serialize = "CMS Generation Full")]
    CmsGenerationFull,
    #[strum(serialize = "CMS Initial Mark")]
    CmsInitialMark,
    #[strum(serialize = "CMS Final Remark")]
    CmsFinalRemark,
    #[strum(serialize = "CMS Concurrent Mark")]
    CmsConcurrentMark,
    #[strum(serialize = "Old Generation Expanded On Last Scavenge")]
    OldGenerationExpandedOnLastScavenge,
    #[strum(serialize = "Old Generation Too Full To Scavenge")]
    OldGenerationTooFullToScavenge,
    #[strum(serialize = "Ergonomics")]
    AdaptiveSizePolicy,
    #[strum(serialize = "Last ditch collection")]
    LastDitchCollection,
}

impl GcCause {
    /// Requested by the application.
    pub fn is_user_requested(self) -> bool {
        matches!(self, GcCause::UserRequested | GcCause::ToolForceGc)
    }

    /// Requested by a tool observing the heap.
    pub fn is_serviceability_requested(self) -> bool {
        matches!(
            self,
            GcCause::ToolForceGc | GcCause::HeapInspection | GcCause::HeapDump
        )
    }

    /// Requested by the allocation path, that is, the heap ran out of room.
    pub fn is_allocation_requested(self) -> bool {
        matches!(
            self,
            GcCause::AllocationFailure | GcCause::LastDitchCollection
        )
    }
}
