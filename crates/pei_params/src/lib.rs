//! Platform constants for the QEMU `virt` machine.

#![no_std]

/// Bytes at the bottom of system memory owned by the platform firmware.
///
/// Never published as usable memory.
pub const FIRMWARE_RESERVED_SIZE: u64 = 16 * 1024 * 1024;

/// Start of the temporary RAM used before permanent memory is discovered.
pub const TEMPORARY_RAM_BASE: u64 = 0x80e0_0000;

/// Size of the temporary RAM.
///
/// The low half is the PEI heap, the high half is the boot hart stack.
pub const TEMPORARY_RAM_SIZE: u64 = 0x20_0000;

/// Firmware volume holding the PEI modules.
pub const PEI_FV_BASE: u64 = 0x2000_0000;
pub const PEI_FV_SIZE: u64 = 0x20_0000;

/// Firmware volume holding the DXE modules.
pub const DXE_FV_BASE: u64 = 0x2020_0000;
pub const DXE_FV_SIZE: u64 = 0xe0_0000;

/// Maximum number of harts.
pub const MAX_HARTS: usize = 8;

/// Maximum number of entries in the hand-off block list.
pub const HOB_CAPACITY: usize = 32;

/// Stack size of each secondary hart.
pub const SECONDARY_STACK_SIZE: usize = 4096 * 4;

/// Device tree node describing the region owned by the M-mode firmware.
pub const RESERVED_MEMORY_NODE_PATH: &str = "/reserved-memory/mmode_resv0";
