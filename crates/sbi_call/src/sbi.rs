use core::arch::asm;

use riscv::register::sscratch;

use crate::{
    FirmwareContext, HardwareCall, HartState, ResetReason, ResetType, SbiError, SbiRet,
    ext::{
        EID_BASE, EID_HSM, EID_SRST, FID_BASE_GET_SPEC_VERSION, FID_BASE_PROBE_EXTENSION,
        FID_HSM_HART_GET_STATUS, FID_HSM_HART_START, FID_SRST_RESET,
    },
};

fn ecall(eid: usize, fid: usize, arg0: usize, arg1: usize, arg2: usize) -> SbiRet {
    let error: isize;
    let value: usize;
    unsafe {
        asm!(
            "ecall",
            inlateout("a0") arg0 => error,
            inlateout("a1") arg1 => value,
            in("a2") arg2,
            in("a6") fid,
            in("a7") eid,
            options(nostack),
        );
    }
    SbiRet { error, value }
}

/// SBI implementation on top of `ecall`.
///
/// The firmware context record is kept in `sscratch`.
#[derive(Debug)]
pub struct Sbi {
    boot_hart_id: usize,
}

impl Sbi {
    /// Creates a handle for the boot flow running on `boot_hart_id`.
    #[must_use]
    pub const fn new(boot_hart_id: usize) -> Self {
        Self { boot_hart_id }
    }

    /// Returns the implemented SBI specification version.
    pub fn spec_version(&self) -> Result<usize, SbiError> {
        ecall(EID_BASE, FID_BASE_GET_SPEC_VERSION, 0, 0, 0).into_result()
    }

    #[must_use]
    pub fn probe_extension(&self, eid: usize) -> bool {
        ecall(EID_BASE, FID_BASE_PROBE_EXTENSION, eid, 0, 0)
            .into_result()
            .is_ok_and(|value| value != 0)
    }

    /// Resets the system.
    ///
    /// Returns only if the reset request was refused.
    pub fn system_reset(&self, reset_type: ResetType, reason: ResetReason) -> SbiError {
        let res = ecall(
            EID_SRST,
            FID_SRST_RESET,
            reset_type as usize,
            reason as usize,
            0,
        );
        match res.into_result() {
            Ok(_) => SbiError::Failed,
            Err(e) => e,
        }
    }
}

impl HardwareCall for Sbi {
    fn boot_hart_id(&self) -> usize {
        self.boot_hart_id
    }

    fn start_hart(&self, hart_id: usize, start_addr: usize, opaque: usize) -> Result<(), SbiError> {
        ecall(EID_HSM, FID_HSM_HART_START, hart_id, start_addr, opaque).into_result()?;
        Ok(())
    }

    fn hart_status(&self, hart_id: usize) -> Result<HartState, SbiError> {
        let state = ecall(EID_HSM, FID_HSM_HART_GET_STATUS, hart_id, 0, 0).into_result()?;
        HartState::from_repr(state).ok_or(SbiError::Failed)
    }

    fn context_pointer(&self) -> *mut FirmwareContext {
        core::ptr::with_exposed_provenance_mut(sscratch::read())
    }

    fn set_context_pointer(&self, context: *mut FirmwareContext) {
        unsafe { sscratch::write(context.expose_provenance()) }
    }
}
