use pei_params::{
    DXE_FV_BASE, DXE_FV_SIZE, FIRMWARE_RESERVED_SIZE, PEI_FV_BASE, PEI_FV_SIZE,
    RESERVED_MEMORY_NODE_PATH, TEMPORARY_RAM_BASE, TEMPORARY_RAM_SIZE,
};

use crate::MemoryRegion;

/// Platform layout the early boot code works against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Bytes at the bottom of system memory never published as usable.
    pub firmware_reserved_size: u64,
    /// Path of the device tree node describing the M-mode firmware region.
    pub reserved_node_path: &'static str,
    pub temporary_ram: MemoryRegion,
    /// PEI and DXE firmware volumes, in publication order.
    pub firmware_volumes: [MemoryRegion; 2],
}

impl PlatformConfig {
    #[must_use]
    pub const fn from_params() -> Self {
        Self {
            firmware_reserved_size: FIRMWARE_RESERVED_SIZE,
            reserved_node_path: RESERVED_MEMORY_NODE_PATH,
            temporary_ram: MemoryRegion::new(TEMPORARY_RAM_BASE, TEMPORARY_RAM_SIZE),
            firmware_volumes: [
                MemoryRegion::new(PEI_FV_BASE, PEI_FV_SIZE),
                MemoryRegion::new(DXE_FV_BASE, DXE_FV_SIZE),
            ],
        }
    }

    /// Splits the temporary RAM into `(heap, stack)`.
    ///
    /// The heap is the low half and the stack the high half.
    #[must_use]
    pub const fn temporary_ram_halves(&self) -> (MemoryRegion, MemoryRegion) {
        let half = self.temporary_ram.size >> 1;
        (
            MemoryRegion::new(self.temporary_ram.base, half),
            MemoryRegion::new(self.temporary_ram.base + half, half),
        )
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::from_params()
    }
}
