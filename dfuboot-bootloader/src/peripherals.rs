// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Peripheral bring-up for the boot ROM.
//!
//! Start-up is split in two. `split()` does only what the entry decision
//! needs: the reset cause and the button pin. Clocks, USB and the remaining
//! pins are brought up by `LateResources::bring_up()` on the update path,
//! so the application is entered with the chip close to its reset state.

use dfuboot_common::board::{BoardRevision, ButtonBias, PinLayout};
use dfuboot_common::ResetCause;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use rp2040_hal as hal;
use rp2040_hal::usb::UsbBus;
use usb_device::class_prelude::UsbBusAllocator;

const XTAL_FREQ_HZ: u32 = 12_000_000;

// Cycles for the pad to settle after its bias changes
const BUTTON_SETTLE_CYCLES: u32 = 1_000;

const BOARD_REVISION: BoardRevision = if cfg!(feature = "board-r0-2") {
    BoardRevision::new(0, 2)
} else if cfg!(feature = "board-r0-5") {
    BoardRevision::new(0, 5)
} else {
    BoardRevision::new(0, 6)
};

/// Pin wiring for the revision this image is built for.
pub const PIN_LAYOUT: PinLayout = PinLayout::for_revision(BOARD_REVISION);

type ResetPin<I> = hal::gpio::Pin<I, hal::gpio::FunctionNull, hal::gpio::PullDown>;

pub type ButtonPin = ResetPin<hal::gpio::bank0::Gpio2>;
pub type LedPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio25, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;
pub type AuxPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio3, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;

/// Static storage for UsbBusAllocator (required by usb-device for 'static lifetime).
static mut USB_BUS: Option<UsbBusAllocator<UsbBus>> = None;

/// Move the bus allocator into static storage. Call once.
pub fn store_usb_bus(bus: UsbBusAllocator<UsbBus>) -> &'static UsbBusAllocator<UsbBus> {
    unsafe { (*core::ptr::addr_of_mut!(USB_BUS)).insert(bus) }
}

pub struct EarlyBoard {
    pub reset_cause: ResetCause,
    pub button: ButtonPin,
    pub late: LateResources,
}

/// Everything the update path needs, still in its reset state.
pub struct LateResources {
    led: ResetPin<hal::gpio::bank0::Gpio25>,
    aux: ResetPin<hal::gpio::bank0::Gpio3>,
    xosc: hal::pac::XOSC,
    clocks: hal::pac::CLOCKS,
    pll_sys: hal::pac::PLL_SYS,
    pll_usb: hal::pac::PLL_USB,
    watchdog: hal::pac::WATCHDOG,
    timer: hal::pac::TIMER,
    usbctrl_regs: hal::pac::USBCTRL_REGS,
    usbctrl_dpram: hal::pac::USBCTRL_DPRAM,
    resets: hal::pac::RESETS,
}

pub struct Board {
    pub led: LedPin,
    /// Held at its update-mode level for as long as the board lives.
    pub aux: Option<AuxPin>,
    pub timer: hal::Timer,
    pub usb: UsbPeripherals,
}

pub struct UsbPeripherals {
    pub regs: hal::pac::USBCTRL_REGS,
    pub dpram: hal::pac::USBCTRL_DPRAM,
    pub clock: hal::clocks::UsbClock,
    pub resets: hal::pac::RESETS,
}

/// Take the peripherals and read the reset cause.
///
/// Uses `Peripherals::steal()`; call once, at the top of `main`.
pub fn split() -> EarlyBoard {
    let mut pac = unsafe { hal::pac::Peripherals::steal() };

    let reset_cause = read_reset_cause(&pac.WATCHDOG, &pac.VREG_AND_CHIP_RESET);

    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    EarlyBoard {
        reset_cause,
        button: pins.gpio2,
        late: LateResources {
            led: pins.gpio25,
            aux: pins.gpio3,
            xosc: pac.XOSC,
            clocks: pac.CLOCKS,
            pll_sys: pac.PLL_SYS,
            pll_usb: pac.PLL_USB,
            watchdog: pac.WATCHDOG,
            timer: pac.TIMER,
            usbctrl_regs: pac.USBCTRL_REGS,
            usbctrl_dpram: pac.USBCTRL_DPRAM,
            resets: pac.RESETS,
        },
    }
}

fn read_reset_cause(
    watchdog: &hal::pac::WATCHDOG,
    chip_reset: &hal::pac::VREG_AND_CHIP_RESET,
) -> ResetCause {
    let mut cause = ResetCause::empty();
    // Set only by a timeout, not by a forced trigger
    if watchdog.reason().read().timer().bit_is_set() {
        cause = cause.union(ResetCause::WATCHDOG);
    }
    if chip_reset.chip_reset().read().had_por().bit_is_set() {
        cause = cause.union(ResetCause::POWER_ON);
    }
    cause
}

/// Bias the button pad for this board and read it. Active low.
pub fn sample_button(button: ButtonPin, bias: ButtonBias) -> bool {
    match bias {
        ButtonBias::InternalPullUp => {
            let mut pin = button.into_pull_up_input();
            cortex_m::asm::delay(BUTTON_SETTLE_CYCLES);
            pin.is_low().unwrap_or(false)
        }
        ButtonBias::External => {
            let mut pin = button.into_floating_input();
            cortex_m::asm::delay(BUTTON_SETTLE_CYCLES);
            pin.is_low().unwrap_or(false)
        }
    }
}

impl LateResources {
    /// Drive the board's output pins, then start clocks and the timer.
    pub fn bring_up(self, layout: PinLayout) -> Board {
        let mut resets = self.resets;

        let mut led = self.led.into_push_pull_output();
        led.set_low().ok();

        let aux = layout.aux.level().map(|high| {
            let mut pin = self.aux.into_push_pull_output();
            pin.set_state(PinState::from(high)).ok();
            pin
        });

        let mut watchdog = hal::Watchdog::new(self.watchdog);
        let Ok(clocks) = hal::clocks::init_clocks_and_plls(
            XTAL_FREQ_HZ,
            self.xosc,
            self.clocks,
            self.pll_sys,
            self.pll_usb,
            &mut resets,
            &mut watchdog,
        ) else {
            defmt::panic!("Clock init failed");
        };

        let timer = hal::Timer::new(self.timer, &mut resets, &clocks);

        Board {
            led,
            aux,
            timer,
            usb: UsbPeripherals {
                regs: self.usbctrl_regs,
                dpram: self.usbctrl_dpram,
                clock: clocks.usb_clock,
                resets,
            },
        }
    }
}
