use crate::MemoryRegion;

/// Memory facts discovered once per boot.
///
/// Produced by the scanner and handed to the planner by value. A missing
/// reserved region is recorded as an empty region at address 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemMemoryWindow {
    pub system_memory_base: u64,
    pub system_memory_size: u64,
    pub mmode_resv_base: u64,
    pub mmode_resv_size: u64,
}

impl SystemMemoryWindow {
    #[must_use]
    pub const fn new(system: MemoryRegion, reserved: MemoryRegion) -> Self {
        Self {
            system_memory_base: system.base,
            system_memory_size: system.size,
            mmode_resv_base: reserved.base,
            mmode_resv_size: reserved.size,
        }
    }

    #[must_use]
    pub const fn system_memory(&self) -> MemoryRegion {
        MemoryRegion::new(self.system_memory_base, self.system_memory_size)
    }

    #[must_use]
    pub const fn reserved(&self) -> MemoryRegion {
        MemoryRegion::new(self.mmode_resv_base, self.mmode_resv_size)
    }
}
