use core::arch::naked_asm;

use log::info;
use pei_params::{MAX_HARTS, SECONDARY_STACK_SIZE};
use riscv::asm;

use crate::layout::TEMPORARY_STACK_TOP;

#[repr(align(16))]
struct HartStack {
    _data: [u8; SECONDARY_STACK_SIZE],
}

static mut SECONDARY_STACKS: [HartStack; MAX_HARTS] = [const {
    HartStack {
        _data: [0; SECONDARY_STACK_SIZE],
    }
}; MAX_HARTS];

/// Returns the initial stack pointer of the `slot`-th secondary hart.
pub fn secondary_stack_top(slot: usize) -> usize {
    let stack = unsafe { &raw const SECONDARY_STACKS[slot] };
    stack.expose_provenance() + size_of::<HartStack>()
}

// OpenSBI jumps here with a0 = hartid, a1 = device tree address.
#[unsafe(naked)]
#[unsafe(link_section = ".text.init")]
#[unsafe(export_name = "_start")]
extern "C" fn start() -> ! {
    naked_asm!(
        // Workaround for spurious LLVM error
        // See also:
        //  - <https://github.com/rust-embedded/riscv/issues/175>
        //  - <https://github.com/rust-embedded/riscv/pull/176>
        r#".attribute arch, "rv64imac""#,

        // the top half of the temporary RAM is the stack.
        "li sp, {stack_top}",
        "mv s0, zero",

        // a0 and a1 are passed through.
        "call {sec_startup}",
        stack_top = const TEMPORARY_STACK_TOP,
        sec_startup = sym crate::sec_startup,
    );
}

/// Start address of secondary harts.
///
/// The HSM extension passes the hart ID in a0 and the stack top in a1.
#[unsafe(naked)]
pub extern "C" fn secondary_start() -> ! {
    naked_asm!(
        r#".attribute arch, "rv64imac""#,
        "mv sp, a1",
        "mv s0, zero",
        "call {park}",
        park = sym park,
    );
}

extern "C" fn park(hart_id: usize) -> ! {
    info!("hart {hart_id} parked");
    loop {
        asm::wfi();
    }
}

/// Moves the stack and frame pointers by `displacement` and jumps to
/// `resume(hart_id, hob_list)`.
///
/// # Safety
///
/// The current stack must already have been copied to its new location.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_stack(
    displacement: i64,
    hart_id: usize,
    hob_list: usize,
    resume: extern "C" fn(usize, usize) -> !,
) -> ! {
    naked_asm!(
        r#".attribute arch, "rv64imac""#,
        "add sp, sp, a0",
        "add s0, s0, a0",
        "mv a0, a1",
        "mv a1, a2",
        "jr a3",
    );
}
