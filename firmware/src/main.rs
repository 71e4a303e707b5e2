#![no_std]
#![no_main]

use core::{convert::Infallible, ptr, slice};

use fdt_blob::DeviceTree;
use hob_list::{HandoffInfo, HobList};
use log::{LevelFilter, error, info, warn};
use pei_params::HOB_CAPACITY;
use platform_pei::{
    LiveRelocator, PeiError, PlatformConfig, RelocationPlan, harts, scanner,
};
use riscv::asm;
use sbi_call::{FirmwareContext, HardwareCall, ResetReason, ResetType, Sbi, SbiError, ext};

mod console;
mod entry;
mod layout;
mod logger;
mod sync;

static CONFIG: PlatformConfig = PlatformConfig::from_params();

// entry::start jumps here on the temporary stack.
extern "C" fn sec_startup(hart_id: usize, fdt: usize) -> ! {
    console::init();
    logger::init(LevelFilter::Info);
    println!();
    println!("rvpei is booting on hart {hart_id}");
    println!();

    let sbi = Sbi::new(hart_id);
    match sbi.spec_version() {
        Ok(version) => {
            let (major, minor) = ext::split_spec_version(version);
            info!("SBI specification v{major}.{minor}");
        }
        Err(e) => warn!("failed to get SBI specification version: {e}"),
    }

    // the record lives on the temporary stack and moves with it.
    let mut context = FirmwareContext::new(hart_id as u64, fdt as u64);
    sbi.set_context_pointer(&raw mut context);

    let Err(e) = pei_main(&sbi);
    error!("boot failed: {e} ({:?})", e.class());
    halt(ResetReason::SystemFailure);
}

fn pei_main(sbi: &Sbi) -> Result<Infallible, PeiError> {
    let mut hobs = HobList::<HOB_CAPACITY>::new();
    let plan = unsafe { platform_pei::initialize_memory(sbi, &CONFIG, &mut hobs) }?;

    match start_secondary_harts(sbi) {
        Ok(()) => {}
        Err(e) if !e.is_fatal() => warn!("continuing on the boot hart only: {e}"),
        Err(e) => return Err(e),
    }

    let temporary = CONFIG.temporary_ram;
    let pei_memory = plan.pei_memory();
    let relocation = RelocationPlan::new(temporary.base, pei_memory.base, temporary.size)?;
    relocation.ensure_disjoint_from(layout::image())?;
    if pei_memory.size < relocation.copy_size() {
        error!("PEI memory {pei_memory:?} is smaller than the temporary RAM");
        return Err(PeiError::UsableWindowUnderflow);
    }

    // the encoded list lives in the heap half and moves with it.
    let (heap, _stack) = CONFIG.temporary_ram_halves();
    #[expect(clippy::cast_possible_truncation)]
    let heap_buf = unsafe {
        slice::from_raw_parts_mut(
            ptr::with_exposed_provenance_mut::<u8>(heap.base as usize),
            heap.size as usize,
        )
    };
    let handoff = HandoffInfo {
        memory_bottom: pei_memory.base,
        memory_top: pei_memory.end()?,
        list_address: relocation.new_heap().base,
    };
    let hob_len = hobs.encode_into(&handoff, heap_buf)?;
    info!("{} hand-off blocks, {hob_len:#x} bytes", hobs.len());

    info!(
        "temporary RAM migration: temporary = {:#x}, permanent = {:#x}, size = {:#x}",
        temporary.base,
        relocation.permanent().base,
        relocation.copy_size()
    );
    let mut relocator = LiveRelocator::new(sbi);
    let displacement = unsafe { relocator.migrate(&relocation) }?;

    #[expect(clippy::cast_possible_truncation)]
    let hob_list = relocation.new_heap().base as usize;
    unsafe { entry::switch_stack(displacement, sbi.boot_hart_id(), hob_list, resume) }
}

fn start_secondary_harts(sbi: &Sbi) -> Result<(), PeiError> {
    if !sbi.probe_extension(ext::EID_HSM) {
        return Err(SbiError::NotSupported.into());
    }

    let context = sbi.context_pointer();
    let fdt = unsafe { (*context).flattened_device_tree };
    #[expect(clippy::cast_possible_truncation)]
    let tree = unsafe { DeviceTree::from_ptr(ptr::with_exposed_provenance(fdt as usize)) }?;

    let mut slot = 0;
    let report = harts::start_secondary_harts(
        sbi,
        scanner::hart_ids(&tree),
        entry::secondary_start as usize,
        |_hart_id| {
            let top = entry::secondary_stack_top(slot);
            slot += 1;
            top
        },
    )?;
    if !report.is_complete() {
        warn!(
            "{} harts started, {} failed, {} ignored",
            report.started.len(),
            report.failed.len(),
            report.ignored
        );
    }
    Ok(())
}

// switch_stack jumps here on the permanent stack.
extern "C" fn resume(hart_id: usize, hob_list: usize) -> ! {
    let sbi = Sbi::new(hart_id);
    let context = sbi.context_pointer();
    let fdt = unsafe { (*context).flattened_device_tree };
    info!("running in permanent memory, context @ {context:p}");
    info!("hand-off block list @ {hob_list:#x}, device tree @ {fdt:#x}");

    // loading the next boot stage is not supported yet.
    halt(ResetReason::NoReason);
}

/// Powers the machine off, or parks the hart if the reset is refused.
pub fn halt(reason: ResetReason) -> ! {
    let err = Sbi::new(0).system_reset(ResetType::Shutdown, reason);
    error!("system reset refused: {err}");
    console::print::freeze();
    loop {
        asm::wfi();
    }
}
