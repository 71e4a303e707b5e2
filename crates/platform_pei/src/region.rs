use core::{fmt, ops::Range};

use crate::PeiError;

/// A physical address range.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryRegion {
    pub base: u64,
    pub size: u64,
}

impl fmt::Debug for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}..{:#x}", self.base, self.base.wrapping_add(self.size))
    }
}

impl MemoryRegion {
    pub const EMPTY: Self = Self { base: 0, size: 0 };

    #[must_use]
    pub const fn new(base: u64, size: u64) -> Self {
        Self { base, size }
    }

    /// Creates the region `[start, end)`.
    ///
    /// `end` below `start` makes an empty region at `start`.
    #[must_use]
    pub const fn from_bounds(start: u64, end: u64) -> Self {
        Self {
            base: start,
            size: end.saturating_sub(start),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn end(&self) -> Result<u64, PeiError> {
        self.base
            .checked_add(self.size)
            .ok_or(PeiError::AddressOverflow)
    }

    pub fn range(&self) -> Result<Range<u64>, PeiError> {
        Ok(self.base..self.end()?)
    }

    /// Returns `true` if both regions share at least one byte.
    ///
    /// Regions whose end overflows are treated as running to the top of the
    /// address space.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let self_end = self.base.saturating_add(self.size);
        let other_end = other.base.saturating_add(other.size);
        !self.is_empty() && !other.is_empty() && self.base < other_end && other.base < self_end
    }

    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }
}
