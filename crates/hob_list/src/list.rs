use core::ops::Range;

use arrayvec::ArrayVec;

use crate::{Guid, Hob, HobError, MemoryType, ResourceAttributes};

/// Append-only sink of hand-off blocks.
pub trait HobBuilder {
    /// Appends `hob` after every entry appended so far.
    fn append(&mut self, hob: Hob) -> Result<(), HobError>;

    fn append_memory_allocation(
        &mut self,
        base: u64,
        len: u64,
        memory_type: MemoryType,
    ) -> Result<(), HobError> {
        self.append(Hob::MemoryAllocation {
            base,
            len,
            memory_type,
        })
    }

    fn append_memory_range(&mut self, base: u64, len: u64) -> Result<(), HobError> {
        self.append(Hob::MemoryRange {
            base,
            len,
            attributes: ResourceAttributes::USABLE_MEMORY,
        })
    }

    fn append_reserved_range(&mut self, base: u64, len: u64) -> Result<(), HobError> {
        self.append(Hob::ReservedRange {
            base,
            len,
            attributes: ResourceAttributes::RESERVED_MEMORY,
        })
    }

    fn append_firmware_volume(&mut self, base: u64, len: u64) -> Result<(), HobError> {
        self.append(Hob::FirmwareVolume { base, len })
    }

    fn append_guid(&mut self, name: Guid, data: u64) -> Result<(), HobError> {
        self.append(Hob::Generic { name, data })
    }
}

/// Fixed-capacity hand-off block list.
///
/// Entries keep insertion order. Every ranged entry is non-empty and fits in
/// the address space, and no two `MemoryAllocation` entries overlap.
#[derive(Debug, Clone, Default)]
pub struct HobList<const N: usize> {
    entries: ArrayVec<Hob, N>,
}

impl<const N: usize> HobList<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: ArrayVec::new_const(),
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[Hob] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn allocations(&self) -> impl Iterator<Item = Range<u64>> + '_ {
        self.entries
            .iter()
            .filter(|hob| hob.is_memory_allocation())
            .filter_map(Hob::range)
    }

    fn check(&self, hob: &Hob) -> Result<(), HobError> {
        let (base, len) = match *hob {
            Hob::MemoryAllocation { base, len, .. }
            | Hob::MemoryRange { base, len, .. }
            | Hob::ReservedRange { base, len, .. }
            | Hob::FirmwareVolume { base, len } => (base, len),
            Hob::Generic { .. } => return Ok(()),
        };
        if len == 0 {
            return Err(HobError::ZeroLength { base });
        }
        let end = base
            .checked_add(len)
            .ok_or(HobError::AddressOverflow { base, len })?;

        if hob.is_memory_allocation()
            && self
                .allocations()
                .any(|other| base < other.end && other.start < end)
        {
            return Err(HobError::OverlappingAllocation { base, len });
        }
        Ok(())
    }
}

impl<const N: usize> HobBuilder for HobList<N> {
    fn append(&mut self, hob: Hob) -> Result<(), HobError> {
        if self.entries.is_full() {
            return Err(HobError::Full);
        }
        self.check(&hob)?;
        self.entries.push(hob);
        Ok(())
    }
}
