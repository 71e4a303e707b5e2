//! Physical memory layout
//!
//! qemu -machine virt with OpenSBI is set up like this:
//!
//! ```text
//! 0x1000_0000 -- UART0
//! 0x2000_0000 -- PEI firmware volume
//! 0x2020_0000 -- DXE firmware volume
//! 0x8000_0000 -- OpenSBI, reserved through /reserved-memory
//! 0x8020_0000 -- OpenSBI jumps here in supervisor mode
//!                IMAGE_BASE. start of this image
//! IMAGE_END   -- end of this image
//! 0x80e0_0000 -- temporary RAM: PEI heap
//! 0x80f0_0000 -- temporary RAM: boot hart stack
//! 0x8100_0000 -- end of the firmware-owned prefix
//! ```

use core::{arch::global_asm, ptr};

use pei_params::{TEMPORARY_RAM_BASE, TEMPORARY_RAM_SIZE};
use platform_pei::MemoryRegion;

// qemu puts UART registers here in physical memory.
pub const UART0: usize = 0x1000_0000;

/// Initial stack pointer of the boot hart.
pub const TEMPORARY_STACK_TOP: u64 = TEMPORARY_RAM_BASE + TEMPORARY_RAM_SIZE;

// get linker symbol addresses
global_asm!(
    "
        .global _rvpei_image_base_addr
        _rvpei_image_base_addr: .dword _rvpei_image_base
        .global _rvpei_image_end_addr
        _rvpei_image_end_addr: .dword _rvpei_image_end
    "
);

unsafe extern "C" {
    #[link_name = "_rvpei_image_base_addr"]
    static IMAGE_BASE: usize;

    #[link_name = "_rvpei_image_end_addr"]
    static IMAGE_END: usize;
}

/// Returns the memory occupied by the running image.
pub fn image() -> MemoryRegion {
    let (base, end) = unsafe { (ptr::read(&raw const IMAGE_BASE), ptr::read(&raw const IMAGE_END)) };
    MemoryRegion::from_bounds(base as u64, end as u64)
}
