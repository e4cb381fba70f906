// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Sample application for dfuboot.
//!
//! Linked at the base of the firmware region. Blinks the LED, runs a small
//! USB serial shell, and asks the boot ROM for update mode when the program
//! button is held or the `bootload` command is typed.

#![no_std]
#![no_main]

use defmt_rtt as _;
use dfuboot_common::app::{self, Board};
use dfuboot_common::layout::{FW_CEILING, FW_START};
use dfuboot_common::{ResetCause, VectorTable, RP2040_LAYOUT};
use embedded_hal::digital::StatefulOutputPin;
use panic_probe as _;
use rp2040_hal as hal;
use rp2040_hal::usb::UsbBus;
use usb_device::class_prelude::UsbBusAllocator;
use usb_device::prelude::*;
use usbd_serial::SerialPort;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

const BLINK_PERIOD_US: u64 = 500_000;
const BUTTON_HOLD_US: u64 = 1_000_000;

/// Static storage for UsbBusAllocator (required by usb-device for 'static lifetime).
static mut USB_BUS: Option<UsbBusAllocator<UsbBus>> = None;

enum Action {
    None,
    Bootload,
    Reboot,
}

/// Process a received command line and write the response.
fn process_command(line: &str, serial: &mut SerialPort<UsbBus>, cause: ResetCause) -> Action {
    match line.trim() {
        "help" | "?" => {
            let _ = serial.write(b"Available commands:\r\n");
            let _ = serial.write(b"  help     - Show this help\r\n");
            let _ = serial.write(b"  status   - Show reset cause and image info\r\n");
            let _ = serial.write(b"  bootload - Reboot into DFU update mode\r\n");
            let _ = serial.write(b"  reboot   - Reboot normally\r\n");
        }
        "status" => {
            let mut buf = [0u8; 256];
            let len = format_status(cause, &mut buf);
            let _ = serial.write(&buf[..len]);
        }
        "bootload" => {
            let _ = serial.write(b"Rebooting into update mode...\r\n");
            return Action::Bootload;
        }
        "reboot" => {
            let _ = serial.write(b"Rebooting...\r\n");
            return Action::Reboot;
        }
        "" => {}
        _ => {
            let _ = serial.write(b"Unknown command. Type 'help' for available commands.\r\n");
        }
    }

    Action::None
}

fn format_status(cause: ResetCause, buf: &mut [u8]) -> usize {
    use core::fmt::Write;

    struct BufWriter<'b> {
        buf: &'b mut [u8],
        pos: usize,
    }

    impl Write for BufWriter<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let bytes = s.as_bytes();
            let remaining = self.buf.len() - self.pos;
            let to_write = bytes.len().min(remaining);
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
            Ok(())
        }
    }

    let vt = unsafe { VectorTable::read_from(FW_START) };
    let mut writer = BufWriter { buf, pos: 0 };
    let _ = write!(
        writer,
        "Status:\r\n  Reset: watchdog={} power_on={}\r\n  Region: 0x{:08x}..0x{:08x}\r\n  SP: 0x{:08x}\r\n  Reset vector: 0x{:08x}\r\n  Valid: {}\r\n",
        cause.watchdog(),
        cause.power_on(),
        FW_START,
        FW_CEILING,
        vt.initial_sp,
        vt.reset_vector,
        vt.is_valid(&RP2040_LAYOUT)
    );

    writer.pos
}

/// Flush pending serial output before the device drops off the bus.
fn drain(usb_dev: &mut UsbDevice<UsbBus>, serial: &mut SerialPort<UsbBus>) {
    for _ in 0..100 {
        usb_dev.poll(&mut [&mut *serial]);
        cortex_m::asm::delay(10_000);
    }
}

#[entry]
fn main() -> ! {
    defmt::println!("Firmware started!");

    let Board {
        mut timer,
        mut watchdog,
        mut led,
        mut button,
        reset_cause,
        usb,
    } = app::init_board();
    let mut usb = usb;

    defmt::println!("Reset cause: {}", reset_cause);

    // Blink to signal firmware alive
    dfuboot_common::blink(&mut led, &mut timer, 5, 100);

    let usb_bus = UsbBusAllocator::new(hal::usb::UsbBus::new(
        usb.regs,
        usb.dpram,
        usb.clock,
        true,
        &mut usb.resets,
    ));
    let usb_bus: &'static UsbBusAllocator<UsbBus> =
        unsafe { (*core::ptr::addr_of_mut!(USB_BUS)).insert(usb_bus) };

    let mut serial = SerialPort::new(usb_bus);
    let Ok(builder) = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x1209, 0x0001)).strings(&[
        StringDescriptors::default()
            .manufacturer("ADNT")
            .product("dfuboot sample")
            .serial_number("FW001"),
    ]) else {
        app::request_update_mode(&mut watchdog);
    };
    let mut usb_dev = builder.device_class(usbd_serial::USB_CLASS_CDC).build();

    defmt::println!("USB CDC initialized, entering main loop");

    let mut cmd_buf = [0u8; 64];
    let mut cmd_pos = 0usize;
    let mut last_blink = timer.get_counter().ticks();
    let mut pressed_since: Option<u64> = None;

    loop {
        usb_dev.poll(&mut [&mut serial]);

        let mut buf = [0u8; 64];
        if let Ok(count) = serial.read(&mut buf) {
            for &byte in &buf[..count] {
                // Echo character
                let _ = serial.write(&[byte]);

                if byte == b'\r' || byte == b'\n' {
                    let _ = serial.write(b"\r\n");

                    if cmd_pos > 0 {
                        let action = match core::str::from_utf8(&cmd_buf[..cmd_pos]) {
                            Ok(line) => process_command(line, &mut serial, reset_cause),
                            Err(_) => Action::None,
                        };
                        cmd_pos = 0;

                        match action {
                            Action::None => {}
                            Action::Bootload => {
                                drain(&mut usb_dev, &mut serial);
                                app::request_update_mode(&mut watchdog);
                            }
                            Action::Reboot => {
                                drain(&mut usb_dev, &mut serial);
                                cortex_m::peripheral::SCB::sys_reset();
                            }
                        }
                    }
                } else if byte == 0x7F || byte == 0x08 {
                    // Backspace
                    if cmd_pos > 0 {
                        cmd_pos -= 1;
                        let _ = serial.write(b"\x08 \x08");
                    }
                } else if cmd_pos < cmd_buf.len() {
                    cmd_buf[cmd_pos] = byte;
                    cmd_pos += 1;
                }
            }
        }

        let now = timer.get_counter().ticks();

        if app::button_held(&mut button) {
            let since = *pressed_since.get_or_insert(now);
            if now - since >= BUTTON_HOLD_US {
                defmt::println!("Button held, requesting update mode");
                app::request_update_mode(&mut watchdog);
            }
        } else {
            pressed_since = None;
        }

        if now - last_blink >= BLINK_PERIOD_US {
            last_blink = now;
            led.toggle().ok();
        }
    }
}
