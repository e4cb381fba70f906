// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! DFU 1.1 class constants, states and status codes.
//!
//! Shared by the boot ROM's USB class and the host tool's simulator.

use core::fmt;

// --- Interface and descriptor constants ---

pub const USB_CLASS_APPLICATION_SPECIFIC: u8 = 0xFE;
pub const DFU_SUBCLASS_FIRMWARE_UPGRADE: u8 = 0x01;
pub const DFU_PROTOCOL_DFU_MODE: u8 = 0x02;
pub const DFU_TYPE_FUNCTIONAL: u8 = 0x21;

pub const DFU_CAN_DNLOAD: u8 = 1 << 0;
pub const DFU_WILL_DETACH: u8 = 1 << 3;

pub const DFU_VERSION: u16 = 0x0110;
pub const DFU_DETACH_TIMEOUT_MS: u16 = 250;

// --- Class requests ---

pub const DFU_DNLOAD: u8 = 0x01;
pub const DFU_GETSTATUS: u8 = 0x03;
pub const DFU_CLRSTATUS: u8 = 0x04;
pub const DFU_GETSTATE: u8 = 0x05;
pub const DFU_ABORT: u8 = 0x06;

/// Body of the DFU functional descriptor (after bLength/bDescriptorType).
///
/// Download only, not manifestation tolerant: the device resets itself after
/// the image is in flash.
pub fn functional_descriptor(transfer_size: u16) -> [u8; 7] {
    let attributes = DFU_CAN_DNLOAD | DFU_WILL_DETACH;
    let timeout = DFU_DETACH_TIMEOUT_MS.to_le_bytes();
    let size = transfer_size.to_le_bytes();
    let version = DFU_VERSION.to_le_bytes();
    [
        attributes, timeout[0], timeout[1], size[0], size[1], version[0], version[1],
    ]
}

/// Device states reported in `bState`.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DfuState {
    AppIdle = 0,
    AppDetach = 1,
    DfuIdle = 2,
    DnloadSync = 3,
    DnBusy = 4,
    DnloadIdle = 5,
    ManifestSync = 6,
    Manifest = 7,
    ManifestWaitReset = 8,
    UploadIdle = 9,
    Error = 10,
}

/// Status codes reported in `bStatus`. Every non-`Ok` value is an error a
/// request can fail with.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DfuStatus {
    Ok = 0x00,
    ErrTarget = 0x01,
    ErrFile = 0x02,
    ErrWrite = 0x03,
    ErrErase = 0x04,
    ErrCheckErased = 0x05,
    ErrProg = 0x06,
    ErrVerify = 0x07,
    ErrAddress = 0x08,
    ErrNotDone = 0x09,
    ErrFirmware = 0x0A,
    ErrVendor = 0x0B,
    ErrUsbReset = 0x0C,
    ErrPowerOnReset = 0x0D,
    ErrUnknown = 0x0E,
    ErrStalledPkt = 0x0F,
}

impl DfuStatus {
    pub fn is_ok(self) -> bool {
        self == DfuStatus::Ok
    }
}

impl fmt::Display for DfuStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DfuStatus::Ok => "no error",
            DfuStatus::ErrTarget => "file not targeted for this device",
            DfuStatus::ErrFile => "file fails vendor verification",
            DfuStatus::ErrWrite => "unable to write memory",
            DfuStatus::ErrErase => "memory erase failed",
            DfuStatus::ErrCheckErased => "memory erase check failed",
            DfuStatus::ErrProg => "program memory failed",
            DfuStatus::ErrVerify => "programmed memory failed verification",
            DfuStatus::ErrAddress => "address out of range",
            DfuStatus::ErrNotDone => "download ended before all data was received",
            DfuStatus::ErrFirmware => "firmware is corrupt",
            DfuStatus::ErrVendor => "vendor-specific error",
            DfuStatus::ErrUsbReset => "unexpected USB reset",
            DfuStatus::ErrPowerOnReset => "unexpected power-on reset",
            DfuStatus::ErrUnknown => "unknown or invalid request",
            DfuStatus::ErrStalledPkt => "unexpected request stalled",
        };
        write!(f, "{} (0x{:02x})", text, *self as u8)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DfuStatus {}

/// Reply to `DFU_GETSTATUS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusRecord {
    pub status: DfuStatus,
    pub poll_timeout_ms: u32,
    pub state: DfuState,
}

impl StatusRecord {
    pub fn to_bytes(&self) -> [u8; 6] {
        let timeout = self.poll_timeout_ms.to_le_bytes();
        [
            self.status as u8,
            timeout[0],
            timeout[1],
            timeout[2],
            self.state as u8,
            0, // iString
        ]
    }
}
