#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FdtError {
    #[error("device tree pointer is null")]
    NullPointer,
    #[error("bad device tree magic: {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported device tree version {version} (last compatible {last_compatible})")]
    UnsupportedVersion { version: u32, last_compatible: u32 },
    #[error("device tree blob is truncated")]
    Truncated,
    #[error("malformed structure block at offset {0:#x}")]
    BadStructure(usize),
}
