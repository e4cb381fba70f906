// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! dfuboot: RP2040 boot ROM with a USB DFU 1.1 update mode.
//!
//! On every reset it either hands off to the application at the base of
//! the firmware region or stays resident and accepts a new image over DFU.

#![no_std]
#![no_main]

mod boot;
mod dfu_class;
mod flash;
mod peripherals;
mod update;

use defmt_rtt as _;
use dfuboot_common::{classify, RP2040_LAYOUT};
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Bootloader init");

    let board = peripherals::split();
    let image = boot::installed_image();
    let image_valid = image.is_valid(&RP2040_LAYOUT);

    defmt::println!(
        "Reset cause: watchdog={}, power_on={}; image sp=0x{:08x} rv=0x{:08x} valid={}",
        board.reset_cause.watchdog(),
        board.reset_cause.power_on(),
        image.initial_sp,
        image.reset_vector,
        image_valid
    );

    let button = board.button;
    let layout = peripherals::PIN_LAYOUT;
    let reason = classify(image_valid, board.reset_cause, move || {
        peripherals::sample_button(button, layout.button)
    });

    match reason {
        Some(reason) => update::enter_update_mode(board.late.bring_up(layout), reason),
        None => unsafe { boot::jump_to_application(image) },
    }
}
