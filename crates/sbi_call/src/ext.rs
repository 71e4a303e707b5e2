//! Extension and function IDs.

use strum::FromRepr;

pub const EID_BASE: usize = 0x10;
pub const EID_HSM: usize = 0x0048_534d;
pub const EID_SRST: usize = 0x5352_5354;

pub const FID_BASE_GET_SPEC_VERSION: usize = 0;
pub const FID_BASE_PROBE_EXTENSION: usize = 3;

pub const FID_HSM_HART_START: usize = 0;
pub const FID_HSM_HART_GET_STATUS: usize = 2;

pub const FID_SRST_RESET: usize = 0;

/// State of a hart as reported by the HSM extension.
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum HartState {
    Started = 0,
    Stopped = 1,
    StartPending = 2,
    StopPending = 3,
    Suspended = 4,
    SuspendPending = 5,
    ResumePending = 6,
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetType {
    Shutdown = 0,
    ColdReboot = 1,
    WarmReboot = 2,
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    NoReason = 0,
    SystemFailure = 1,
}

/// Splits an SBI specification version into `(major, minor)`.
#[must_use]
pub const fn split_spec_version(version: usize) -> (usize, usize) {
    ((version >> 24) & 0x7f, version & 0xff_ffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_version() {
        assert_eq!(split_spec_version(0x0200_0000), (2, 0));
        assert_eq!(split_spec_version(0x0100_0003), (1, 3));
    }

    #[test]
    fn hart_states() {
        assert_eq!(HartState::from_repr(1), Some(HartState::Stopped));
        assert_eq!(HartState::from_repr(6), Some(HartState::ResumePending));
        assert_eq!(HartState::from_repr(7), None);
    }
}
