//! In-memory hand-off block layout.
//!
//! The list opens with a phase hand-off block describing the memory handed
//! to the next phase. Every block starts with a [`RawHeader`] whose `length`
//! covers the whole block, and the list is terminated by an end-of-list
//! header.

use dataview::{Pod, PodMethods as _};
use strum::FromRepr;

use crate::{Guid, Hob, HobError, HobList, ResourceType};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum HobType {
    Handoff = 0x0001,
    MemoryAllocation = 0x0002,
    ResourceDescriptor = 0x0003,
    GuidExtension = 0x0004,
    FirmwareVolume = 0x0005,
    EndOfHobList = 0xffff,
}

#[repr(C)]
#[derive(Debug, Pod)]
pub(crate) struct RawHeader {
    pub(crate) hob_type: u16,
    pub(crate) length: u16,
    reserved: u32,
}

const HANDOFF_TABLE_VERSION: u32 = 0x0009;
const BOOT_WITH_FULL_CONFIGURATION: u32 = 0;

/// Memory described by the phase hand-off block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffInfo {
    /// Lowest address of the memory owned by the next phase.
    pub memory_bottom: u64,
    /// One past the highest address of that memory.
    pub memory_top: u64,
    /// Physical address the encoded list will be read from.
    pub list_address: u64,
}

#[repr(C)]
#[derive(Debug, Pod)]
pub(crate) struct RawHandoff {
    header: RawHeader,
    pub(crate) version: u32,
    pub(crate) boot_mode: u32,
    pub(crate) memory_top: u64,
    pub(crate) memory_bottom: u64,
    pub(crate) free_memory_top: u64,
    pub(crate) free_memory_bottom: u64,
    pub(crate) end_of_hob_list: u64,
}

#[repr(C)]
#[derive(Debug, Pod)]
pub(crate) struct RawMemoryAllocation {
    header: RawHeader,
    name: [u8; 16],
    pub(crate) base: u64,
    pub(crate) len: u64,
    pub(crate) memory_type: u32,
    reserved: [u8; 4],
}

#[repr(C)]
#[derive(Debug, Pod)]
pub(crate) struct RawResourceDescriptor {
    header: RawHeader,
    owner: [u8; 16],
    pub(crate) resource_type: u32,
    pub(crate) attributes: u32,
    pub(crate) start: u64,
    pub(crate) len: u64,
}

#[repr(C)]
#[derive(Debug, Pod)]
pub(crate) struct RawFirmwareVolume {
    header: RawHeader,
    pub(crate) base: u64,
    pub(crate) len: u64,
}

#[repr(C)]
#[derive(Debug, Pod)]
pub(crate) struct RawGuidExtension {
    header: RawHeader,
    pub(crate) name: [u8; 16],
    pub(crate) data: u64,
}

impl RawHeader {
    fn new<T>(hob_type: HobType) -> Self {
        // every block is a few dozen bytes
        #[expect(clippy::cast_possible_truncation)]
        let length = size_of::<T>() as u16;
        Self {
            hob_type: hob_type as u16,
            length,
            reserved: 0,
        }
    }
}

impl Hob {
    /// Number of bytes the block occupies in memory.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::MemoryAllocation { .. } => size_of::<RawMemoryAllocation>(),
            Self::MemoryRange { .. } | Self::ReservedRange { .. } => {
                size_of::<RawResourceDescriptor>()
            }
            Self::FirmwareVolume { .. } => size_of::<RawFirmwareVolume>(),
            Self::Generic { .. } => size_of::<RawGuidExtension>(),
        }
    }

    #[must_use]
    pub fn hob_type(&self) -> HobType {
        match self {
            Self::MemoryAllocation { .. } => HobType::MemoryAllocation,
            Self::MemoryRange { .. } | Self::ReservedRange { .. } => HobType::ResourceDescriptor,
            Self::FirmwareVolume { .. } => HobType::FirmwareVolume,
            Self::Generic { .. } => HobType::GuidExtension,
        }
    }

    fn encode(&self, out: &mut [u8]) {
        match *self {
            Self::MemoryAllocation {
                base,
                len,
                memory_type,
            } => {
                let raw = RawMemoryAllocation {
                    header: RawHeader::new::<RawMemoryAllocation>(HobType::MemoryAllocation),
                    name: Guid::ZERO.to_bytes(),
                    base,
                    len,
                    memory_type: memory_type as u32,
                    reserved: [0; 4],
                };
                out.copy_from_slice(raw.as_bytes());
            }
            Self::MemoryRange {
                base,
                len,
                attributes,
            }
            | Self::ReservedRange {
                base,
                len,
                attributes,
            } => {
                let resource_type = if matches!(self, Self::MemoryRange { .. }) {
                    ResourceType::SystemMemory
                } else {
                    ResourceType::MemoryReserved
                };
                let raw = RawResourceDescriptor {
                    header: RawHeader::new::<RawResourceDescriptor>(HobType::ResourceDescriptor),
                    owner: Guid::ZERO.to_bytes(),
                    resource_type: resource_type as u32,
                    attributes: attributes.bits(),
                    start: base,
                    len,
                };
                out.copy_from_slice(raw.as_bytes());
            }
            Self::FirmwareVolume { base, len } => {
                let raw = RawFirmwareVolume {
                    header: RawHeader::new::<RawFirmwareVolume>(HobType::FirmwareVolume),
                    base,
                    len,
                };
                out.copy_from_slice(raw.as_bytes());
            }
            Self::Generic { name, data } => {
                let raw = RawGuidExtension {
                    header: RawHeader::new::<RawGuidExtension>(HobType::GuidExtension),
                    name: name.to_bytes(),
                    data,
                };
                out.copy_from_slice(raw.as_bytes());
            }
        }
    }
}

impl<const N: usize> HobList<N> {
    /// Number of bytes [`Self::encode_into`] writes, hand-off and
    /// end-of-list blocks included.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        size_of::<RawHandoff>()
            + self
                .entries()
                .iter()
                .map(Hob::encoded_len)
                .sum::<usize>()
            + size_of::<RawHeader>()
    }

    /// Writes a phase hand-off block, the list, and an end-of-list block.
    ///
    /// Addresses in the hand-off block assume `buf` is read back at
    /// `handoff.list_address`. Free memory starts right after the list and
    /// ends at `handoff.memory_top`.
    ///
    /// Returns the number of bytes written.
    pub fn encode_into(&self, handoff: &HandoffInfo, buf: &mut [u8]) -> Result<usize, HobError> {
        let required = self.encoded_len();
        if buf.len() < required {
            return Err(HobError::BufferTooSmall { required });
        }
        let end_offset = required - size_of::<RawHeader>();

        let phit = RawHandoff {
            header: RawHeader::new::<RawHandoff>(HobType::Handoff),
            version: HANDOFF_TABLE_VERSION,
            boot_mode: BOOT_WITH_FULL_CONFIGURATION,
            memory_top: handoff.memory_top,
            memory_bottom: handoff.memory_bottom,
            free_memory_top: handoff.memory_top,
            free_memory_bottom: handoff.list_address + required as u64,
            end_of_hob_list: handoff.list_address + end_offset as u64,
        };
        let mut offset = size_of::<RawHandoff>();
        buf[..offset].copy_from_slice(phit.as_bytes());

        for hob in self.entries() {
            let len = hob.encoded_len();
            hob.encode(&mut buf[offset..offset + len]);
            offset += len;
        }
        let end = RawHeader::new::<RawHeader>(HobType::EndOfHobList);
        buf[offset..required].copy_from_slice(end.as_bytes());
        Ok(required)
    }
}
