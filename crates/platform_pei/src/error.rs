use fdt_blob::FdtError;
use hob_list::HobError;
use sbi_call::SbiError;

/// Error returned by the early boot memory code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PeiError {
    #[error("platform data unsupported")]
    Unsupported,
    #[error("firmware context record not found")]
    NotFound,
    #[error("invalid device tree: {0}")]
    InvalidBlob(#[from] FdtError),
    #[error("no system memory found")]
    NoSystemMemory,
    #[error("reserved region {base:#x}+{size:#x} is not inside system memory")]
    ReservedOutsideSystemMemory { base: u64, size: u64 },
    #[error("usable memory window underflows")]
    UsableWindowUnderflow,
    #[error("address computation overflows")]
    AddressOverflow,
    #[error("allocation {base:#x}+{size:#x} overlaps another allocation")]
    OverlappingAllocation { base: u64, size: u64 },
    #[error("relocation source and destination overlap")]
    RelocationOverlap,
    #[error("temporary RAM has already been migrated")]
    AlreadyRelocated,
    #[error("cannot append descriptor: {0}")]
    Descriptor(#[from] HobError),
    #[error("hardware call failed: {0}")]
    Sbi(#[from] SbiError),
}

/// How an error is handled by the boot flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// No device tree or no context record.
    MissingPlatformData,
    /// Discovered memory contradicts the platform layout.
    ConfigurationInconsistency,
    /// Relocation ranges alias each other or the running image.
    RelocationPrecondition,
    /// The descriptor list refused an entry.
    Descriptor,
    /// A hardware call failed.
    HardwareCall,
}

impl PeiError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unsupported | Self::NotFound | Self::InvalidBlob(_) => {
                ErrorClass::MissingPlatformData
            }
            Self::NoSystemMemory
            | Self::ReservedOutsideSystemMemory { .. }
            | Self::UsableWindowUnderflow
            | Self::AddressOverflow
            | Self::OverlappingAllocation { .. } => ErrorClass::ConfigurationInconsistency,
            Self::RelocationOverlap | Self::AlreadyRelocated => {
                ErrorClass::RelocationPrecondition
            }
            Self::Descriptor(_) => ErrorClass::Descriptor,
            Self::Sbi(_) => ErrorClass::HardwareCall,
        }
    }

    /// Returns `true` if boot cannot continue after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.class() != ErrorClass::HardwareCall
    }
}
