//! Early boot memory initialization.
//!
//! The boot hart runs these steps on temporary RAM:
//!
//! 1. [`scanner`] reads the device tree and produces a
//!    [`SystemMemoryWindow`].
//! 2. [`planner`] carves the window into usable and reserved ranges and
//!    appends them to the hand-off block list, followed by the device tree
//!    address and the firmware volumes ([`fv`]).
//! 3. [`relocator`] moves the live heap and stack into the permanent memory
//!    chosen by the planner.
//!
//! Secondary harts stay parked until [`harts::start_secondary_harts`] is
//! called.

#![cfg_attr(not(test), no_std)]

use hob_list::HobBuilder;
use log::info;
use sbi_call::HardwareCall;

pub use self::{
    config::PlatformConfig,
    error::{ErrorClass, PeiError},
    planner::MemoryPlan,
    region::MemoryRegion,
    relocator::{LiveRelocator, RelocationPlan, RelocationState},
    window::SystemMemoryWindow,
};

mod config;
mod error;
pub mod fv;
pub mod harts;
pub mod planner;
mod region;
pub mod relocator;
pub mod scanner;
mod window;

/// Discovers system memory and publishes everything later stages need.
///
/// Returns the plan whose PEI memory becomes the relocation target.
///
/// # Safety
///
/// The registered firmware context record and the device tree it names
/// must satisfy the contract of [`scanner::scan_context`].
pub unsafe fn initialize_memory<H, B>(
    hw: &H,
    config: &PlatformConfig,
    builder: &mut B,
) -> Result<MemoryPlan, PeiError>
where
    H: HardwareCall + ?Sized,
    B: HobBuilder + ?Sized,
{
    let window = unsafe { scanner::scan_context(hw, config.reserved_node_path) }?;
    let plan = planner::plan(&window, config.firmware_reserved_size)?;
    info!("PEI memory {:?}", plan.pei_memory());

    planner::publish_ram_regions(&plan, builder)?;
    let context = hw.context_pointer();
    let fdt = unsafe { (*context).flattened_device_tree };
    planner::publish_device_tree(fdt, builder)?;
    fv::publish_firmware_volumes(&config.firmware_volumes, builder)?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use fdt_blob::builder::FdtBuilder;
    use hob_list::{FDT_HOB_GUID, Hob, HobList, MemoryType};
    use sbi_call::{FirmwareContext, HartState, SbiError};

    use super::*;

    struct Machine(Cell<*mut FirmwareContext>);

    impl HardwareCall for Machine {
        fn boot_hart_id(&self) -> usize {
            0
        }

        fn start_hart(&self, _: usize, _: usize, _: usize) -> Result<(), SbiError> {
            Ok(())
        }

        fn hart_status(&self, _: usize) -> Result<HartState, SbiError> {
            Ok(HartState::Stopped)
        }

        fn context_pointer(&self) -> *mut FirmwareContext {
            self.0.get()
        }

        fn set_context_pointer(&self, context: *mut FirmwareContext) {
            self.0.set(context);
        }
    }

    fn virt_blob() -> Vec<u8> {
        let mut b = FdtBuilder::new();
        b.begin_node("")
            .property_u32("#address-cells", 2)
            .property_u32("#size-cells", 2)
            .property_str("compatible", "riscv-virtio");
        b.begin_node("reserved-memory")
            .property_u32("#address-cells", 2)
            .property_u32("#size-cells", 2);
        b.begin_node("mmode_resv0@80000000")
            .property_reg(&[(0x8000_0000, 0x4_0000)])
            .end_node();
        b.end_node();
        b.begin_node("memory@80000000")
            .property_str("device_type", "memory")
            .property_reg(&[(0x8000_0000, 0x8000_0000)])
            .end_node();
        b.end_node();
        b.finish()
    }

    #[test]
    fn qemu_virt_boot() {
        let blob = virt_blob();
        let fdt = blob.as_ptr().expose_provenance() as u64;
        let mut context = FirmwareContext::new(0, fdt);
        let hw = Machine(Cell::new(&raw mut context));
        let config = PlatformConfig::from_params();
        let mut list = HobList::<16>::new();

        let plan = unsafe { initialize_memory(&hw, &config, &mut list) }.unwrap();

        // OpenSBI's reservation sits inside the firmware prefix
        assert_eq!(
            plan.pei_memory(),
            MemoryRegion::from_bounds(0x8100_0000, 0x1_0000_0000)
        );
        let entries = list.entries();
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0].range(), Some(0x8100_0000..0x1_0000_0000));
        assert_eq!(
            entries[1],
            Hob::Generic {
                name: FDT_HOB_GUID,
                data: fdt
            }
        );
        assert!(matches!(
            entries[2],
            Hob::MemoryAllocation {
                memory_type: MemoryType::BootServicesData,
                ..
            }
        ));
        assert!(matches!(entries[3], Hob::FirmwareVolume { .. }));
    }

    #[test]
    fn missing_context_is_fatal() {
        let hw = Machine(Cell::new(core::ptr::null_mut()));
        let mut list = HobList::<16>::new();
        let err = unsafe { initialize_memory(&hw, &PlatformConfig::from_params(), &mut list) }
            .unwrap_err();
        assert_eq!(err, PeiError::NotFound);
        assert!(err.is_fatal());
        assert!(list.is_empty());
    }

    #[test]
    fn error_classes() {
        assert_eq!(
            PeiError::Unsupported.class(),
            ErrorClass::MissingPlatformData
        );
        assert_eq!(
            PeiError::UsableWindowUnderflow.class(),
            ErrorClass::ConfigurationInconsistency
        );
        assert_eq!(
            PeiError::RelocationOverlap.class(),
            ErrorClass::RelocationPrecondition
        );
        assert_eq!(
            PeiError::AlreadyRelocated.class(),
            ErrorClass::RelocationPrecondition
        );
        assert!(PeiError::AlreadyRelocated.is_fatal());
        assert!(!PeiError::Sbi(SbiError::Denied).is_fatal());
    }
}
