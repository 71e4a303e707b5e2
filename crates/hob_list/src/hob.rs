use core::ops::Range;

use bitflags::bitflags;
use strum::FromRepr;

use crate::Guid;

/// EFI memory type of a memory allocation.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum MemoryType {
    Reserved = 0,
    LoaderCode = 1,
    LoaderData = 2,
    BootServicesCode = 3,
    BootServicesData = 4,
    RuntimeServicesCode = 5,
    RuntimeServicesData = 6,
    Conventional = 7,
    Unusable = 8,
    AcpiReclaim = 9,
    AcpiNvs = 10,
    MemoryMappedIo = 11,
    MemoryMappedIoPortSpace = 12,
    PalCode = 13,
    Persistent = 14,
}

/// Kind of resource a resource descriptor describes.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum ResourceType {
    SystemMemory = 0,
    MemoryMappedIo = 1,
    Io = 2,
    FirmwareDevice = 3,
    MemoryMappedIoPort = 4,
    MemoryReserved = 5,
    IoReserved = 6,
}

bitflags! {
    /// Resource descriptor attributes.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResourceAttributes: u32 {
        const PRESENT = 0x0000_0001;
        const INITIALIZED = 0x0000_0002;
        const TESTED = 0x0000_0004;
        const UNCACHEABLE = 0x0000_0400;
        const WRITE_COMBINEABLE = 0x0000_0800;
        const WRITE_THROUGH_CACHEABLE = 0x0000_1000;
        const WRITE_BACK_CACHEABLE = 0x0000_2000;
    }
}

impl ResourceAttributes {
    const CACHEABILITY: Self = Self::UNCACHEABLE
        .union(Self::WRITE_COMBINEABLE)
        .union(Self::WRITE_THROUGH_CACHEABLE)
        .union(Self::WRITE_BACK_CACHEABLE);

    /// Attributes of RAM handed to later boot stages.
    pub const USABLE_MEMORY: Self = Self::PRESENT
        .union(Self::INITIALIZED)
        .union(Self::TESTED)
        .union(Self::CACHEABILITY);

    /// Attributes of RAM that must not be used by later boot stages.
    pub const RESERVED_MEMORY: Self = Self::PRESENT
        .union(Self::INITIALIZED)
        .union(Self::CACHEABILITY);
}

/// A hand-off block describing one fact about the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hob {
    /// Memory owned by firmware.
    MemoryAllocation {
        base: u64,
        len: u64,
        memory_type: MemoryType,
    },
    /// System memory available to later boot stages.
    MemoryRange {
        base: u64,
        len: u64,
        attributes: ResourceAttributes,
    },
    /// System memory that later boot stages must leave alone.
    ReservedRange {
        base: u64,
        len: u64,
        attributes: ResourceAttributes,
    },
    /// A firmware volume that later boot stages may load modules from.
    FirmwareVolume { base: u64, len: u64 },
    /// GUID-named data that does not fit the other kinds.
    Generic { name: Guid, data: u64 },
}

impl Hob {
    /// Returns the physical range the entry describes.
    ///
    /// `Generic` entries describe no range.
    #[must_use]
    pub fn range(&self) -> Option<Range<u64>> {
        let (base, len) = match *self {
            Self::MemoryAllocation { base, len, .. }
            | Self::MemoryRange { base, len, .. }
            | Self::ReservedRange { base, len, .. }
            | Self::FirmwareVolume { base, len } => (base, len),
            Self::Generic { .. } => return None,
        };
        Some(base..base.saturating_add(len))
    }

    #[must_use]
    pub fn is_memory_allocation(&self) -> bool {
        matches!(self, Self::MemoryAllocation { .. })
    }
}
