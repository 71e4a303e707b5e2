use strum::FromRepr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, thiserror::Error)]
#[repr(isize)]
pub enum SbiError {
    #[error("failed")]
    Failed = -1,
    #[error("not supported")]
    NotSupported = -2,
    #[error("invalid parameter")]
    InvalidParam = -3,
    #[error("denied")]
    Denied = -4,
    #[error("invalid address")]
    InvalidAddress = -5,
    #[error("already available")]
    AlreadyAvailable = -6,
    #[error("already started")]
    AlreadyStarted = -7,
    #[error("already stopped")]
    AlreadyStopped = -8,
}

/// Raw return value of an SBI call, `a0` and `a1`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbiRet {
    pub error: isize,
    pub value: usize,
}

impl SbiRet {
    /// Converts the status code into a `Result`.
    ///
    /// Codes this crate does not know are reported as [`SbiError::Failed`].
    pub fn into_result(self) -> Result<usize, SbiError> {
        if self.error == 0 {
            return Ok(self.value);
        }
        Err(SbiError::from_repr(self.error).unwrap_or(SbiError::Failed))
    }
}
