// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update mode: DFU over USB until a transfer completes.
//!
//! The USB device is polled from `USBCTRL_IRQ`, so flash work and the DFU
//! state machine run in interrupt context. The main loop only blinks the
//! LED and watches the exit flag the download handler raises on
//! manifestation. Once raised, the loop detaches from the bus, drops the
//! flash cache and resets the chip.

use core::cell::RefCell;

use cortex_m::interrupt::Mutex;
use cortex_m::peripheral::NVIC;
use dfuboot_common::{
    DfuSession, DownloadHandler, ExitFlag, FlashProgrammer, UpdateReason, RP2040_LAYOUT,
};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::StatefulOutputPin;
use rp2040_hal as hal;
use rp2040_hal::pac::interrupt;
use rp2040_hal::usb::UsbBus;
use usb_device::class_prelude::UsbBusAllocator;
use usb_device::prelude::*;

use crate::dfu_class::DfuClass;
use crate::flash::RomFlash;
use crate::peripherals::{self, Board, LedPin};

// pid.codes test VID/PID
const USB_VID: u16 = 0x1209;
const USB_PID: u16 = 0x0001;

const BLINK_PERIOD_MS: u32 = 300;
// Lets the final GETSTATUS reply drain before the pull-up goes away
const DETACH_GRACE_MS: u32 = 50;

// Every PSM block except ROSC and XOSC
const PSM_WDSEL_ALL_BUT_OSCILLATORS: u32 = 0x0001_FFFC;

static EXIT_AND_JUMP: ExitFlag = ExitFlag::new();

struct UsbStack {
    device: UsbDevice<'static, UsbBus>,
    dfu: DfuClass<RomFlash>,
}

static USB: Mutex<RefCell<Option<UsbStack>>> = Mutex::new(RefCell::new(None));

/// Enter update mode. Never returns; leaves through a chip reset.
pub fn enter_update_mode(board: Board, reason: UpdateReason) -> ! {
    defmt::println!("Update mode: {}", reason);

    let Board {
        mut led,
        aux: _aux,
        mut timer,
        usb,
    } = board;
    let mut usb = usb;

    let bus = peripherals::store_usb_bus(UsbBusAllocator::new(UsbBus::new(
        usb.regs,
        usb.dpram,
        usb.clock,
        true,
        &mut usb.resets,
    )));

    let handler = DownloadHandler::new(RomFlash::new(), RP2040_LAYOUT, &EXIT_AND_JUMP);
    let mut session = DfuSession::new(handler);
    if reason == UpdateReason::InvalidImage {
        session.mark_firmware_corrupt();
    }

    let dfu = DfuClass::new(bus, session);
    let device = build_device(bus);

    cortex_m::interrupt::free(|cs| {
        USB.borrow(cs).replace(Some(UsbStack { device, dfu }));
    });
    unsafe {
        NVIC::unmask(hal::pac::Interrupt::USBCTRL_IRQ);
    }

    defmt::println!("DFU ready");
    run_update_mode(&mut led, &mut timer);

    timer.delay_ms(DETACH_GRACE_MS);
    finish_update()
}

fn build_device(bus: &'static UsbBusAllocator<UsbBus>) -> UsbDevice<'static, UsbBus> {
    let strings = StringDescriptors::default()
        .manufacturer("ADNT")
        .product("dfuboot")
        .serial_number("0001");

    let builder = UsbDeviceBuilder::new(bus, UsbVidPid(USB_VID, USB_PID))
        .strings(&[strings])
        .and_then(|b| b.max_packet_size_0(64));

    match builder {
        Ok(builder) => builder.device_release(0x0100).build(),
        Err(_) => defmt::panic!("USB descriptor setup failed"),
    }
}

/// Blink until the download handler raises the exit flag.
fn run_update_mode(led: &mut LedPin, timer: &mut hal::Timer) {
    while !EXIT_AND_JUMP.is_raised() {
        led.toggle().ok();
        timer.delay_ms(BLINK_PERIOD_MS);
    }
    defmt::println!("Transfer complete");
}

/// Detach, drop cached flash contents and reset into the new image.
fn finish_update() -> ! {
    NVIC::mask(hal::pac::Interrupt::USBCTRL_IRQ);
    let stack = cortex_m::interrupt::free(|cs| USB.borrow(cs).take());

    detach_from_bus();

    if let Some(mut stack) = stack {
        stack
            .dfu
            .session_mut()
            .handler_mut()
            .flash_mut()
            .invalidate_cache();
    }

    reset_chip()
}

fn detach_from_bus() {
    let regs = unsafe { &*hal::pac::USBCTRL_REGS::ptr() };
    regs.sie_ctrl().modify(|_, w| w.pullup_en().clear_bit());
}

/// Full chip reset through the watchdog's force trigger.
///
/// A forced reset leaves `REASON.TIMER` clear, so the next boot is not
/// mistaken for a recovery request.
fn reset_chip() -> ! {
    let psm = unsafe { &*hal::pac::PSM::ptr() };
    let watchdog = unsafe { &*hal::pac::WATCHDOG::ptr() };

    psm.wdsel()
        .write(|w| unsafe { w.bits(PSM_WDSEL_ALL_BUT_OSCILLATORS) });
    watchdog.ctrl().write(|w| w.trigger().set_bit());

    loop {
        cortex_m::asm::nop();
    }
}

#[interrupt]
fn USBCTRL_IRQ() {
    cortex_m::interrupt::free(|cs| {
        if let Some(usb) = USB.borrow(cs).borrow_mut().as_mut() {
            usb.device.poll(&mut [&mut usb.dfu]);
        }
    });
}
