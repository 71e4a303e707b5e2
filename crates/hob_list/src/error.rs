#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HobError {
    #[error("hand-off block list is full")]
    Full,
    #[error("zero-length range at {base:#x}")]
    ZeroLength { base: u64 },
    #[error("range at {base:#x} with length {len:#x} overflows the address space")]
    AddressOverflow { base: u64, len: u64 },
    #[error("allocation {base:#x}+{len:#x} overlaps an existing allocation")]
    OverlappingAllocation { base: u64, len: u64 },
    #[error("buffer too small: {required} bytes required")]
    BufferTooSmall { required: usize },
}
