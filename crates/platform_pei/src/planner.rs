//! Carving system memory into published ranges.
//!
//! With an M-mode reservation inside system memory the window is laid out as
//!
//! | range                                          | descriptor         |
//! |------------------------------------------------|--------------------|
//! | `[system_memory_base, +FIRMWARE_RESERVED_SIZE)`| none               |
//! | `[.., mmode_resv_base)`                        | memory range       |
//! | `[mmode_resv_base, +mmode_resv_size)`          | reserved range     |
//! | `[.., system_memory_base + system_memory_size)`| memory range       |
//!
//! followed by a reserved-type allocation covering the whole window.
//! Without one, everything above the firmware prefix is a single memory
//! range.

use arrayvec::ArrayVec;
use hob_list::{FDT_HOB_GUID, Hob, HobBuilder, MemoryType, ResourceAttributes};
use log::{error, info};

use crate::{MemoryRegion, PeiError, SystemMemoryWindow};

/// Result of carving a [`SystemMemoryWindow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPlan {
    window: SystemMemoryWindow,
    pei_memory: MemoryRegion,
    descriptors: ArrayVec<Hob, 4>,
}

impl MemoryPlan {
    #[must_use]
    pub fn window(&self) -> &SystemMemoryWindow {
        &self.window
    }

    /// Memory handed to the PEI core as permanent memory.
    #[must_use]
    pub fn pei_memory(&self) -> MemoryRegion {
        self.pei_memory
    }

    /// Descriptors to publish, in publication order.
    #[must_use]
    pub fn descriptors(&self) -> &[Hob] {
        &self.descriptors
    }
}

fn memory_range(region: MemoryRegion) -> Hob {
    Hob::MemoryRange {
        base: region.base,
        len: region.size,
        attributes: ResourceAttributes::USABLE_MEMORY,
    }
}

/// Computes the usable, reserved and firmware-owned ranges of `window`.
///
/// The lowest `firmware_reserved_size` bytes of system memory are never
/// published. A non-empty reserved region must lie inside system memory. One
/// that ends at or below the firmware prefix, or that is empty, is ignored.
pub fn plan(
    window: &SystemMemoryWindow,
    firmware_reserved_size: u64,
) -> Result<MemoryPlan, PeiError> {
    let system = window.system_memory();
    let reserved = window.reserved();

    if system.is_empty() {
        error!("no system memory");
        return Err(PeiError::NoSystemMemory);
    }
    let system_end = system.end()?;
    let usable_start = system
        .base
        .checked_add(firmware_reserved_size)
        .ok_or(PeiError::AddressOverflow)?;
    if usable_start >= system_end {
        error!(
            "system memory size {:#x} does not exceed the firmware prefix {firmware_reserved_size:#x}",
            system.size
        );
        return Err(PeiError::UsableWindowUnderflow);
    }
    let reserved_end = reserved.end()?;

    if !reserved.is_empty() && (reserved.base < system.base || reserved_end > system_end) {
        error!("reserved region {reserved:?} is not inside system memory {system:?}");
        return Err(PeiError::ReservedOutsideSystemMemory {
            base: reserved.base,
            size: reserved.size,
        });
    }

    let mut descriptors = ArrayVec::new();

    if reserved.is_empty() || reserved_end <= usable_start {
        let usable = MemoryRegion::from_bounds(usable_start, system_end);
        descriptors.push(memory_range(usable));
        return Ok(MemoryPlan {
            window: *window,
            pei_memory: usable,
            descriptors,
        });
    }

    if reserved.base < usable_start {
        error!("reserved region {reserved:?} starts below {usable_start:#x}");
        return Err(PeiError::UsableWindowUnderflow);
    }

    let below = MemoryRegion::from_bounds(usable_start, reserved.base);
    let above = MemoryRegion::from_bounds(reserved_end, system_end);

    if !below.is_empty() {
        descriptors.push(memory_range(below));
    }
    descriptors.push(Hob::ReservedRange {
        base: reserved.base,
        len: reserved.size,
        attributes: ResourceAttributes::RESERVED_MEMORY,
    });
    if !above.is_empty() {
        descriptors.push(memory_range(above));
    }
    descriptors.push(Hob::MemoryAllocation {
        base: system.base,
        len: system.size,
        memory_type: MemoryType::Reserved,
    });

    let pei_memory = if below.is_empty() { above } else { below };
    if pei_memory.is_empty() {
        error!("reserved region {reserved:?} leaves no usable memory");
        return Err(PeiError::UsableWindowUnderflow);
    }

    Ok(MemoryPlan {
        window: *window,
        pei_memory,
        descriptors,
    })
}

/// Appends the descriptors of `plan` to `builder`.
pub fn publish_ram_regions<B>(plan: &MemoryPlan, builder: &mut B) -> Result<(), PeiError>
where
    B: HobBuilder + ?Sized,
{
    for hob in plan.descriptors() {
        if let Some(range) = hob.range() {
            info!("{:?}: {:#x} - {:#x}", hob.hob_type(), range.start, range.end);
        }
        builder.append(*hob)?;
    }
    Ok(())
}

/// Records the device tree address for later boot stages.
pub fn publish_device_tree<B>(fdt_addr: u64, builder: &mut B) -> Result<(), PeiError>
where
    B: HobBuilder + ?Sized,
{
    info!("device tree @ {fdt_addr:#x}");
    builder.append_guid(FDT_HOB_GUID, fdt_addr)?;
    Ok(())
}
