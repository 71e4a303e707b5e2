//! Moving the live heap and stack from temporary to permanent memory.
//!
//! Temporary RAM is split in half: the low half is the heap and the high
//! half is the stack. In permanent memory the halves swap places, so the new
//! stack starts at the permanent base:
//!
//! ```text
//! temporary  [ heap | stack ]
//!                \      /
//!                 \    /
//!                  \  /
//!                   \/
//!                   /\
//!                  /  \
//! permanent  [ stack | heap ]
//! ```
//!
//! The heap is copied before the stack. The firmware context record lives on
//! the stack, so its pointer moves by exactly the stack displacement.

use core::ptr;

use log::{error, info};
use sbi_call::{FirmwareContext, HardwareCall};

use crate::{MemoryRegion, PeiError};

/// Source and destination of one relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationPlan {
    temporary_base: u64,
    permanent_base: u64,
    copy_size: u64,
}

impl RelocationPlan {
    /// Checks that the temporary and permanent ranges neither overlap nor
    /// overflow.
    pub fn new(temporary_base: u64, permanent_base: u64, copy_size: u64) -> Result<Self, PeiError> {
        let plan = Self {
            temporary_base,
            permanent_base,
            copy_size,
        };
        let temporary = plan.temporary();
        let permanent = plan.permanent();
        temporary.end()?;
        permanent.end()?;
        if temporary.overlaps(&permanent) {
            error!("temporary RAM {temporary:?} overlaps permanent RAM {permanent:?}");
            return Err(PeiError::RelocationOverlap);
        }
        Ok(plan)
    }

    /// Rejects the plan if either range overlaps `image`.
    pub fn ensure_disjoint_from(&self, image: MemoryRegion) -> Result<(), PeiError> {
        for (name, range) in [("temporary", self.temporary()), ("permanent", self.permanent())] {
            if range.overlaps(&image) {
                error!("{name} RAM {range:?} overlaps the firmware image {image:?}");
                return Err(PeiError::RelocationOverlap);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn temporary(&self) -> MemoryRegion {
        MemoryRegion::new(self.temporary_base, self.copy_size)
    }

    #[must_use]
    pub fn permanent(&self) -> MemoryRegion {
        MemoryRegion::new(self.permanent_base, self.copy_size)
    }

    #[must_use]
    pub fn copy_size(&self) -> u64 {
        self.copy_size
    }

    fn half(&self) -> u64 {
        self.copy_size >> 1
    }

    #[must_use]
    pub fn old_heap(&self) -> MemoryRegion {
        MemoryRegion::new(self.temporary_base, self.half())
    }

    #[must_use]
    pub fn new_heap(&self) -> MemoryRegion {
        MemoryRegion::new(self.permanent_base + self.half(), self.half())
    }

    #[must_use]
    pub fn old_stack(&self) -> MemoryRegion {
        MemoryRegion::new(self.temporary_base + self.half(), self.half())
    }

    #[must_use]
    pub fn new_stack(&self) -> MemoryRegion {
        MemoryRegion::new(self.permanent_base, self.half())
    }

    /// Distance the stack moves, to be added to every stack address.
    #[must_use]
    pub fn stack_displacement(&self) -> i64 {
        self.new_stack().base.wrapping_sub(self.old_stack().base).cast_signed()
    }
}

/// Returns the relocated context address and the displacement applied to it.
#[must_use]
pub fn relocate_context(plan: &RelocationPlan, old_context: u64) -> (u64, i64) {
    let displacement = plan.stack_displacement();
    (old_context.wrapping_add_signed(displacement), displacement)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationState {
    RunningInTemporary,
    Copying,
    RunningInPermanent,
}

/// Performs the copy and context fix-up of a [`RelocationPlan`].
///
/// The caller adjusts the stack pointer by the returned displacement.
#[derive(Debug)]
pub struct LiveRelocator<'a, H: ?Sized> {
    hw: &'a H,
    state: RelocationState,
}

impl<'a, H> LiveRelocator<'a, H>
where
    H: HardwareCall + ?Sized,
{
    #[must_use]
    pub fn new(hw: &'a H) -> Self {
        Self {
            hw,
            state: RelocationState::RunningInTemporary,
        }
    }

    #[must_use]
    pub fn state(&self) -> RelocationState {
        self.state
    }

    /// Copies the heap then the stack, and moves the context pointer.
    ///
    /// Returns the stack displacement. A zero-sized plan copies nothing and
    /// returns 0. Fails with [`PeiError::AlreadyRelocated`] once a migration
    /// has started.
    ///
    /// # Safety
    ///
    /// Both ranges of `plan` must be valid for reads and writes, and nothing
    /// but the current execution may use them. The registered context
    /// pointer must point into the old stack. The caller must switch its
    /// stack pointer by the returned displacement before touching the old
    /// stack again.
    pub unsafe fn migrate(&mut self, plan: &RelocationPlan) -> Result<i64, PeiError> {
        if self.state != RelocationState::RunningInTemporary {
            error!("temporary RAM migration requested in state {:?}", self.state);
            return Err(PeiError::AlreadyRelocated);
        }
        if plan.copy_size() == 0 {
            return Ok(0);
        }

        let old_context = self.hw.context_pointer();
        if old_context.is_null() {
            error!("firmware context is null");
            return Err(PeiError::NotFound);
        }
        let len = usize::try_from(plan.half()).map_err(|_e| PeiError::AddressOverflow)?;

        self.state = RelocationState::Copying;
        unsafe {
            copy(plan.old_heap(), plan.new_heap(), len);
            copy(plan.old_stack(), plan.new_stack(), len);
        }

        let (new_context, displacement) =
            relocate_context(plan, old_context.expose_provenance() as u64);
        #[expect(clippy::cast_possible_truncation)]
        let new_context = ptr::with_exposed_provenance_mut::<FirmwareContext>(new_context as usize);
        self.hw.set_context_pointer(new_context);
        self.state = RelocationState::RunningInPermanent;

        info!("firmware context relocated to {new_context:p}");
        Ok(displacement)
    }
}

#[expect(clippy::cast_possible_truncation)]
unsafe fn copy(from: MemoryRegion, to: MemoryRegion, len: usize) {
    let src = ptr::with_exposed_provenance::<u8>(from.base as usize);
    let dst = ptr::with_exposed_provenance_mut::<u8>(to.base as usize);
    unsafe { ptr::copy_nonoverlapping(src, dst, len) };
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use sbi_call::{HartState, SbiError};

    use super::*;

    struct ContextCell(Cell<*mut FirmwareContext>);

    impl HardwareCall for ContextCell {
        fn boot_hart_id(&self) -> usize {
            0
        }

        fn start_hart(&self, _: usize, _: usize, _: usize) -> Result<(), SbiError> {
            Err(SbiError::NotSupported)
        }

        fn hart_status(&self, _: usize) -> Result<HartState, SbiError> {
            Err(SbiError::NotSupported)
        }

        fn context_pointer(&self) -> *mut FirmwareContext {
            self.0.get()
        }

        fn set_context_pointer(&self, context: *mut FirmwareContext) {
            self.0.set(context);
        }
    }

    fn addr_of(buf: &mut [u64]) -> u64 {
        buf.as_mut_ptr().expose_provenance() as u64
    }

    #[test]
    fn halves_swap_places() {
        let plan = RelocationPlan::new(0x1000, 0x10_0000, 0x800).unwrap();
        assert_eq!(plan.old_heap(), MemoryRegion::new(0x1000, 0x400));
        assert_eq!(plan.old_stack(), MemoryRegion::new(0x1400, 0x400));
        assert_eq!(plan.new_stack(), MemoryRegion::new(0x10_0000, 0x400));
        assert_eq!(plan.new_heap(), MemoryRegion::new(0x10_0400, 0x400));
        assert_eq!(plan.stack_displacement(), 0x10_0000 - 0x1400);
    }

    #[test]
    fn context_moves_with_the_stack() {
        let plan = RelocationPlan::new(0x8000_0000, 0x9000_0000, 0x10_0000).unwrap();
        let (new, displacement) = relocate_context(&plan, 0x800f_ff00);
        assert_eq!(displacement, 0x9000_0000 - 0x8008_0000);
        assert_eq!(new, 0x9007_ff00);

        // moving down
        let plan = RelocationPlan::new(0x9000_0000, 0x8000_0000, 0x10_0000).unwrap();
        let (new, displacement) = relocate_context(&plan, 0x900f_ff00);
        assert!(displacement < 0);
        assert_eq!(new, 0x8007_ff00);
        assert!(plan.new_stack().contains(new));
    }

    #[test]
    fn aliasing_ranges_are_rejected() {
        assert_eq!(
            RelocationPlan::new(0x8000_0000, 0x8008_0000, 0x10_0000),
            Err(PeiError::RelocationOverlap)
        );
        assert_eq!(
            RelocationPlan::new(u64::MAX - 0xff, 0, 0x1000),
            Err(PeiError::AddressOverflow)
        );

        let plan = RelocationPlan::new(0x8000_0000, 0x9000_0000, 0x1000).unwrap();
        assert_eq!(
            plan.ensure_disjoint_from(MemoryRegion::new(0x9000_0800, 0x1000)),
            Err(PeiError::RelocationOverlap)
        );
        assert!(plan
            .ensure_disjoint_from(MemoryRegion::new(0x8800_0000, 0x1000))
            .is_ok());
    }

    #[test]
    fn image_must_not_reach_temporary_ram() {
        // image at 0x8020_0000 growing past the temporary RAM base
        let plan = RelocationPlan::new(0x80e0_0000, 0x8100_0000, 0x20_0000).unwrap();
        assert_eq!(
            plan.ensure_disjoint_from(MemoryRegion::from_bounds(0x8020_0000, 0x80e0_1000)),
            Err(PeiError::RelocationOverlap)
        );
        assert!(plan
            .ensure_disjoint_from(MemoryRegion::from_bounds(0x8020_0000, 0x80e0_0000))
            .is_ok());
    }

    #[test]
    fn zero_length_is_noop() {
        let mut context = FirmwareContext::new(0, 0);
        let hw = ContextCell(Cell::new(&raw mut context));
        let plan = RelocationPlan::new(0x1000, 0x2000, 0).unwrap();
        let mut relocator = LiveRelocator::new(&hw);
        assert_eq!(unsafe { relocator.migrate(&plan) }, Ok(0));
        assert_eq!(relocator.state(), RelocationState::RunningInTemporary);
        assert_eq!(hw.context_pointer(), &raw mut context);
    }

    #[test]
    fn migrate_copies_and_fixes_context() {
        const WORDS: usize = 64;
        let mut temporary = vec![0_u64; WORDS];
        let mut permanent = vec![0_u64; WORDS];
        for (i, word) in temporary.iter_mut().enumerate() {
            *word = 0x1000 + i as u64;
        }

        // context record near the top of the old stack
        let context_index = WORDS - 4;
        let context = FirmwareContext::new(3, 0x8220_0000);
        unsafe {
            temporary
                .as_mut_ptr()
                .add(context_index)
                .cast::<FirmwareContext>()
                .write(context);
        }
        let expected = temporary.clone();

        let temporary_base = addr_of(&mut temporary);
        let permanent_base = addr_of(&mut permanent);
        let size = (WORDS * size_of::<u64>()) as u64;
        let plan = RelocationPlan::new(temporary_base, permanent_base, size).unwrap();

        let old_context = unsafe { temporary.as_mut_ptr().add(context_index) }.cast();
        let hw = ContextCell(Cell::new(old_context));
        let mut relocator = LiveRelocator::new(&hw);
        let displacement = unsafe { relocator.migrate(&plan) }.unwrap();
        assert_eq!(relocator.state(), RelocationState::RunningInPermanent);
        assert_eq!(displacement, plan.stack_displacement());

        let half = WORDS / 2;
        assert_eq!(permanent[half..], expected[..half], "heap");
        assert_eq!(permanent[..half], expected[half..], "stack");

        let new_context = hw.context_pointer();
        assert_eq!(
            new_context.addr(),
            old_context.addr().wrapping_add_signed(displacement as isize)
        );
        assert_eq!(
            new_context.addr(),
            permanent.as_ptr().addr() + (context_index - half) * size_of::<u64>()
        );
        assert_eq!(unsafe { *new_context }, context);

        // the old stack is gone, a second migration must not run
        assert_eq!(
            unsafe { relocator.migrate(&plan) },
            Err(PeiError::AlreadyRelocated)
        );
        assert_eq!(relocator.state(), RelocationState::RunningInPermanent);
        assert_eq!(hw.context_pointer(), new_context);
    }

    #[test]
    fn null_context_is_reported() {
        let mut temporary = vec![0_u64; 8];
        let mut permanent = vec![0_u64; 8];
        let plan =
            RelocationPlan::new(addr_of(&mut temporary), addr_of(&mut permanent), 64).unwrap();
        let hw = ContextCell(Cell::new(ptr::null_mut()));
        let mut relocator = LiveRelocator::new(&hw);
        assert_eq!(unsafe { relocator.migrate(&plan) }, Err(PeiError::NotFound));
        assert_eq!(relocator.state(), RelocationState::RunningInTemporary);
    }
}
