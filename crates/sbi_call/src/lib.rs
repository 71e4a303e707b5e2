//! RISC-V Supervisor Binary Interface calls.
//!
//! Platform code talks to the machine through [`HardwareCall`]; the
//! [`Sbi`] implementation issues real `ecall`s and is only available when
//! building for riscv64.

#![cfg_attr(not(test), no_std)]

pub use self::{
    context::FirmwareContext,
    error::{SbiError, SbiRet},
    ext::{HartState, ResetReason, ResetType},
};
#[cfg(target_arch = "riscv64")]
pub use self::sbi::Sbi;

mod context;
mod error;
pub mod ext;
#[cfg(target_arch = "riscv64")]
mod sbi;

/// Services the platform code needs from the machine mode firmware.
pub trait HardwareCall {
    /// Returns the ID of the hart running the boot flow.
    fn boot_hart_id(&self) -> usize;

    /// Starts `hart_id` at physical address `start_addr` with `opaque` in `a1`.
    fn start_hart(&self, hart_id: usize, start_addr: usize, opaque: usize) -> Result<(), SbiError>;

    /// Returns the state of `hart_id`.
    ///
    /// Fails with [`SbiError::NotSupported`] if hart state management is
    /// not implemented.
    fn hart_status(&self, hart_id: usize) -> Result<HartState, SbiError>;

    /// Returns the registered firmware context record, null if none is.
    fn context_pointer(&self) -> *mut FirmwareContext;

    /// Registers `context` as the firmware context record.
    fn set_context_pointer(&self, context: *mut FirmwareContext);
}
