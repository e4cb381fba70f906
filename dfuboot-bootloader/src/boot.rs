// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Installed image lookup and the hand-off into it.

use dfuboot_common::layout::FW_START;
use dfuboot_common::VectorTable;

/// Vector table at the base of the firmware region.
pub fn installed_image() -> VectorTable {
    // XIP flash is always mapped
    unsafe { VectorTable::read_from(FW_START) }
}

/// Transfer control to the installed application. No state is passed.
///
/// # Safety
/// `vt` must have passed the validity check, and nothing may still expect
/// an interrupt from this program.
pub unsafe fn jump_to_application(vt: VectorTable) -> ! {
    defmt::println!(
        "Jumping to application at 0x{:08x} (sp=0x{:08x})",
        vt.reset_vector,
        vt.initial_sp
    );

    prepare_for_handoff();
    relocate_vector_table(FW_START);
    jump(vt.initial_sp, vt.reset_vector);
}

/// Quiesce the NVIC. Clocks and pads are left as they are; the
/// application's runtime brings them up from scratch.
unsafe fn prepare_for_handoff() {
    cortex_m::interrupt::disable();

    // Disable all NVIC interrupts
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    NVIC_ICER.write_volatile(0xFFFF_FFFF);

    // Clear all pending interrupts in NVIC
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);
}

unsafe fn relocate_vector_table(base: u32) {
    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(base);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i", // cortex-m-rt and the SDK both expect PRIMASK=0
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
