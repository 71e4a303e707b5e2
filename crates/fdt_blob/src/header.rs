use core::ops::Range;

use dataview::{DataView, Pod};

use crate::FdtError;

/// On-blob layout of the header.
#[repr(C)]
#[derive(Pod)]
struct RawHeader {
    magic: [u8; 4],
    totalsize: [u8; 4],
    off_dt_struct: [u8; 4],
    off_dt_strings: [u8; 4],
    off_mem_rsvmap: [u8; 4],
    version: [u8; 4],
    last_comp_version: [u8; 4],
    boot_cpuid_phys: [u8; 4],
    size_dt_strings: [u8; 4],
    size_dt_struct: [u8; 4],
}

/// Device tree header, converted to host byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u32,
    pub total_size: u32,
    pub off_dt_struct: u32,
    pub off_dt_strings: u32,
    pub off_mem_rsvmap: u32,
    pub version: u32,
    pub last_comp_version: u32,
    pub boot_cpuid_phys: u32,
    pub size_dt_strings: u32,
    pub size_dt_struct: u32,
}

impl Header {
    pub const MAGIC: u32 = 0xd00d_feed;
    pub const SIZE: usize = size_of::<RawHeader>();

    /// Oldest version whose layout this reader understands.
    pub const FIRST_SUPPORTED_VERSION: u32 = 16;
    /// Newest version whose layout this reader understands.
    pub const LAST_SUPPORTED_VERSION: u32 = 17;

    pub(crate) fn parse(bytes: &[u8]) -> Result<Self, FdtError> {
        let raw = DataView::from(bytes)
            .try_get::<RawHeader>(0)
            .ok_or(FdtError::Truncated)?;

        let header = Self {
            magic: u32::from_be_bytes(raw.magic),
            total_size: u32::from_be_bytes(raw.totalsize),
            off_dt_struct: u32::from_be_bytes(raw.off_dt_struct),
            off_dt_strings: u32::from_be_bytes(raw.off_dt_strings),
            off_mem_rsvmap: u32::from_be_bytes(raw.off_mem_rsvmap),
            version: u32::from_be_bytes(raw.version),
            last_comp_version: u32::from_be_bytes(raw.last_comp_version),
            boot_cpuid_phys: u32::from_be_bytes(raw.boot_cpuid_phys),
            size_dt_strings: u32::from_be_bytes(raw.size_dt_strings),
            size_dt_struct: u32::from_be_bytes(raw.size_dt_struct),
        };
        header.check()?;
        Ok(header)
    }

    fn check(&self) -> Result<(), FdtError> {
        if self.magic != Self::MAGIC {
            return Err(FdtError::BadMagic(self.magic));
        }
        if self.version < Self::FIRST_SUPPORTED_VERSION
            || self.last_comp_version > Self::LAST_SUPPORTED_VERSION
        {
            return Err(FdtError::UnsupportedVersion {
                version: self.version,
                last_compatible: self.last_comp_version,
            });
        }

        let total = self.total_size();
        if total < Self::SIZE
            || to_usize(self.off_dt_struct) < Self::SIZE
            || to_usize(self.off_dt_strings) < Self::SIZE
            || self.struct_range().end > total
            || self.strings_range().end > total
        {
            return Err(FdtError::Truncated);
        }
        Ok(())
    }

    #[must_use]
    pub fn total_size(&self) -> usize {
        to_usize(self.total_size)
    }

    /// Byte range of the structure block within the blob.
    ///
    /// Version 16 blobs have no `size_dt_struct`, so the block is assumed to
    /// run up to the end of the blob.
    #[must_use]
    pub fn struct_range(&self) -> Range<usize> {
        let start = to_usize(self.off_dt_struct);
        let end = if self.version >= 17 {
            start.saturating_add(to_usize(self.size_dt_struct))
        } else {
            self.total_size()
        };
        start..end
    }

    #[must_use]
    pub fn strings_range(&self) -> Range<usize> {
        let start = to_usize(self.off_dt_strings);
        start..start.saturating_add(to_usize(self.size_dt_strings))
    }
}

fn to_usize(n: u32) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
