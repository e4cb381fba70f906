// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common types and boot logic for dfuboot.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: Enables `std` support for host tools
//! - `embedded` feature: Enables RP2040 helpers for applications (rp2040-hal)
//! - `defmt` feature: Derives `defmt::Format` on public types

#![cfg_attr(not(feature = "std"), no_std)]

pub mod board;
pub mod download;
pub mod entry;
pub mod image;
pub mod layout;
pub mod protocol;
pub mod session;

// Helpers for applications running under the boot ROM
#[cfg(feature = "embedded")]
pub mod app;

// Re-export commonly used types
pub use download::{DownloadHandler, DownloadState, ExitFlag, FlashProgrammer};
pub use entry::{classify, should_enter_update_mode, ResetCause, UpdateReason};
pub use image::VectorTable;
pub use layout::{MemoryLayout, RP2040_LAYOUT};
pub use protocol::{DfuState, DfuStatus, StatusRecord};
pub use session::DfuSession;

// Embedded-specific exports (only with embedded feature)
#[cfg(feature = "embedded")]
use embedded_hal::delay::DelayNs;
#[cfg(feature = "embedded")]
use embedded_hal::digital::OutputPin;

/// Blink an LED a specified number of times.
#[cfg(feature = "embedded")]
pub fn blink(led: &mut impl OutputPin, timer: &mut impl DelayNs, count: u32, period_ms: u32) {
    for _ in 0..count {
        led.set_high().ok();
        timer.delay_ms(period_ms);
        led.set_low().ok();
        timer.delay_ms(period_ms);
    }
}
