// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Helpers for applications running under dfuboot.
//!
//! An application asks for recovery by letting the watchdog expire. The
//! boot ROM sees the watchdog-timeout reset cause and stays in update mode.

use embedded_hal::digital::InputPin;
use rp2040_hal as hal;
use rp2040_hal::fugit::ExtU32;

use crate::board::{BUTTON_PIN, LED_PIN};
use crate::entry::ResetCause;

pub type LedPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio25, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;
pub type ButtonPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio2, hal::gpio::FunctionSioInput, hal::gpio::PullUp>;

const _: () = assert!(LED_PIN == 25 && BUTTON_PIN == 2);

pub struct Board {
    pub timer: hal::Timer,
    pub watchdog: hal::Watchdog,
    pub led: LedPin,
    pub button: ButtonPin,
    pub reset_cause: ResetCause,
    pub usb: UsbPeripherals,
}

pub struct UsbPeripherals {
    pub regs: hal::pac::USBCTRL_REGS,
    pub dpram: hal::pac::USBCTRL_DPRAM,
    pub clock: hal::clocks::UsbClock,
    pub resets: hal::pac::RESETS,
}

/// Program button, active low.
pub fn button_held(button: &mut ButtonPin) -> bool {
    button.is_low().unwrap_or(false)
}

/// Initialize RP2040 board peripherals.
///
/// Uses `Peripherals::steal()`; call once, before anything else owns the PAC.
pub fn init_board() -> Board {
    let mut pac = unsafe { hal::pac::Peripherals::steal() };

    let reset_cause = read_reset_cause(&pac.WATCHDOG, &pac.VREG_AND_CHIP_RESET);

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let Ok(clocks) = hal::clocks::init_clocks_and_plls(
        12_000_000u32,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    ) else {
        request_update_mode(&mut watchdog);
    };

    let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    Board {
        timer,
        watchdog,
        led: pins.gpio25.into_push_pull_output(),
        button: pins.gpio2.into_pull_up_input(),
        reset_cause,
        usb: UsbPeripherals {
            regs: pac.USBCTRL_REGS,
            dpram: pac.USBCTRL_DPRAM,
            clock: clocks.usb_clock,
            resets: pac.RESETS,
        },
    }
}

fn read_reset_cause(
    watchdog: &hal::pac::WATCHDOG,
    chip_reset: &hal::pac::VREG_AND_CHIP_RESET,
) -> ResetCause {
    let mut cause = ResetCause::empty();
    if watchdog.reason().read().timer().bit_is_set() {
        cause = cause.union(ResetCause::WATCHDOG);
    }
    if chip_reset.chip_reset().read().had_por().bit_is_set() {
        cause = cause.union(ResetCause::POWER_ON);
    }
    cause
}

/// Reset into the boot ROM's update mode.
///
/// Arms the watchdog with a short timeout and stops feeding it, so the
/// next reset is reported as a watchdog timeout.
pub fn request_update_mode(watchdog: &mut hal::Watchdog) -> ! {
    cortex_m::interrupt::disable();
    watchdog.start(1_000u32.micros());
    loop {
        cortex_m::asm::nop();
    }
}
